//! The typed packet roster.

mod game;
mod generic;
mod message;
mod variants;

pub use game::{
    Disconnect, ItemChangeObject, ModifyItemInventory, SendInventoryState, SendItemDatabaseData,
    SendMapData, SendTileUpdateData, TileChangeRequest,
};
pub use generic::{GenericGame, GenericText, GenericVariant};
pub use message::{Input, JoinRequest, Log, Quit, QuitToExit, ServerHello, ValidateWorld};
pub use variants::{OnRemove, OnSendToServer, OnSpawn, OnSuperMainStart};

use crate::id::PacketId;
use crate::payload::Payload;

/// Every packet this proxy can hold.
///
/// The three generic variants at the end carry anything the typed roster
/// does not claim, so the enum is total over decodable traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Handshake greeting.
    ServerHello(ServerHello),
    /// Client leaves the world.
    Quit(Quit),
    /// Client exits to the world list.
    QuitToExit(QuitToExit),
    /// Client asks to enter a world.
    JoinRequest(JoinRequest),
    /// Client asks for world validation.
    ValidateWorld(ValidateWorld),
    /// Player input.
    Input(Input),
    /// Relayed log line.
    Log(Log),
    /// Server kick.
    Disconnect(Disconnect),
    /// World map download.
    SendMapData(SendMapData),
    /// Tile update.
    SendTileUpdateData(SendTileUpdateData),
    /// Item database download.
    SendItemDatabaseData(SendItemDatabaseData),
    /// Inventory snapshot.
    SendInventoryState(SendInventoryState),
    /// Inventory delta.
    ModifyItemInventory(ModifyItemInventory),
    /// Tile punch or place.
    TileChangeRequest(TileChangeRequest),
    /// World object change.
    ItemChangeObject(ItemChangeObject),
    /// Redirect to a world host.
    OnSendToServer(OnSendToServer),
    /// Post-logon bootstrap.
    OnSuperMainStart(OnSuperMainStart),
    /// Avatar spawn.
    OnSpawn(OnSpawn),
    /// Avatar despawn.
    OnRemove(OnRemove),
    /// Unclaimed text frame.
    GenericText(GenericText),
    /// Unclaimed game packet frame.
    GenericGame(GenericGame),
    /// Unclaimed RPC frame.
    GenericVariant(GenericVariant),
}

impl Packet {
    /// Identity of this packet, [`PacketId::Unknown`] for the generics.
    pub fn id(&self) -> PacketId {
        match self {
            Self::ServerHello(_) => PacketId::ServerHello,
            Self::Quit(_) => PacketId::Quit,
            Self::QuitToExit(_) => PacketId::QuitToExit,
            Self::JoinRequest(_) => PacketId::JoinRequest,
            Self::ValidateWorld(_) => PacketId::ValidateWorld,
            Self::Input(_) => PacketId::Input,
            Self::Log(_) => PacketId::Log,
            Self::Disconnect(_) => PacketId::Disconnect,
            Self::SendMapData(_) => PacketId::SendMapData,
            Self::SendTileUpdateData(_) => PacketId::SendTileUpdateData,
            Self::SendItemDatabaseData(_) => PacketId::SendItemDatabaseData,
            Self::SendInventoryState(_) => PacketId::SendInventoryState,
            Self::ModifyItemInventory(_) => PacketId::ModifyItemInventory,
            Self::TileChangeRequest(_) => PacketId::TileChangeRequest,
            Self::ItemChangeObject(_) => PacketId::ItemChangeObject,
            Self::OnSendToServer(_) => PacketId::OnSendToServer,
            Self::OnSuperMainStart(_) => PacketId::OnSuperMainStart,
            Self::OnSpawn(_) => PacketId::OnSpawn,
            Self::OnRemove(_) => PacketId::OnRemove,
            Self::GenericText(_) | Self::GenericGame(_) | Self::GenericVariant(_) => {
                PacketId::Unknown
            }
        }
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        match self {
            Self::ServerHello(packet) => packet.write(),
            Self::Quit(packet) => packet.write(),
            Self::QuitToExit(packet) => packet.write(),
            Self::JoinRequest(packet) => packet.write(),
            Self::ValidateWorld(packet) => packet.write(),
            Self::Input(packet) => packet.write(),
            Self::Log(packet) => packet.write(),
            Self::Disconnect(packet) => packet.write(),
            Self::SendMapData(packet) => packet.write(),
            Self::SendTileUpdateData(packet) => packet.write(),
            Self::SendItemDatabaseData(packet) => packet.write(),
            Self::SendInventoryState(packet) => packet.write(),
            Self::ModifyItemInventory(packet) => packet.write(),
            Self::TileChangeRequest(packet) => packet.write(),
            Self::ItemChangeObject(packet) => packet.write(),
            Self::OnSendToServer(packet) => packet.write(),
            Self::OnSuperMainStart(packet) => packet.write(),
            Self::OnSpawn(packet) => packet.write(),
            Self::OnRemove(packet) => packet.write(),
            Self::GenericText(packet) => packet.write(),
            Self::GenericGame(packet) => packet.write(),
            Self::GenericVariant(packet) => packet.write(),
        }
    }

    /// Encode straight to frame bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.write().encode()
    }
}
