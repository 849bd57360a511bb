//! Stable identities for the packets this proxy understands.

use crate::payload::Payload;
use crate::types::{MessageKind, PacketType};

/// Wire name of the post-logon RPC that carries the item database hash.
pub const SUPER_MAIN_START_FUNCTION: &str = "OnSuperMainStartAcceptLogonHrdxs47254722215a";

/// Identity of a decoded packet, used to key registries and listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketId {
    /// Handshake greeting.
    ServerHello,
    /// Client leaves the world.
    Quit,
    /// Client exits to the world list.
    QuitToExit,
    /// Client asks to enter a world.
    JoinRequest,
    /// Client asks the server to validate the current world.
    ValidateWorld,
    /// Client chat or command input.
    Input,
    /// Client-side log line relayed to the server.
    Log,
    /// Server kicks the session.
    Disconnect,
    /// World tile map download.
    SendMapData,
    /// Single tile update.
    SendTileUpdateData,
    /// Compressed `items.dat` download.
    SendItemDatabaseData,
    /// Inventory snapshot.
    SendInventoryState,
    /// Inventory delta.
    ModifyItemInventory,
    /// Client punches or places a tile.
    TileChangeRequest,
    /// World object change.
    ItemChangeObject,
    /// Redirect to a world-serving host.
    OnSendToServer,
    /// Post-logon bootstrap call.
    OnSuperMainStart,
    /// Avatar spawn.
    OnSpawn,
    /// Avatar despawn.
    OnRemove,
    /// Anything the tables below do not name.
    Unknown,
}

enum TextMatch {
    Exact,
    Prefix,
}

/// Patterns tried in order against the first line of a text payload.
const TEXT_PATTERNS: &[(TextMatch, &str, PacketId)] = &[
    (TextMatch::Exact, "action|quit", PacketId::Quit),
    (TextMatch::Exact, "action|quit_to_exit", PacketId::QuitToExit),
    (TextMatch::Exact, "action|join_request", PacketId::JoinRequest),
    (TextMatch::Exact, "action|validate_world", PacketId::ValidateWorld),
    (TextMatch::Prefix, "action|input", PacketId::Input),
    (TextMatch::Exact, "action|log", PacketId::Log),
];

const GAME_PACKET_IDS: &[(PacketType, PacketId)] = &[
    (PacketType::Disconnect, PacketId::Disconnect),
    (PacketType::SendMapData, PacketId::SendMapData),
    (PacketType::SendTileUpdateData, PacketId::SendTileUpdateData),
    (PacketType::SendItemDatabaseData, PacketId::SendItemDatabaseData),
    (PacketType::SendInventoryState, PacketId::SendInventoryState),
    (PacketType::ModifyItemInventory, PacketId::ModifyItemInventory),
    (PacketType::TileChangeRequest, PacketId::TileChangeRequest),
    (PacketType::ItemChangeObject, PacketId::ItemChangeObject),
];

const VARIANT_FUNCTIONS: &[(&str, PacketId)] = &[
    ("OnSendToServer", PacketId::OnSendToServer),
    (SUPER_MAIN_START_FUNCTION, PacketId::OnSuperMainStart),
    ("OnSpawn", PacketId::OnSpawn),
    ("OnRemove", PacketId::OnRemove),
];

/// Derive the identity of a decoded payload.
///
/// Text payloads are matched on their first serialized line, game payloads
/// on the header type byte, and RPC payloads on the function name.
pub fn derive_packet_id(payload: &Payload) -> PacketId {
    match payload {
        Payload::Text(text) => {
            if text.kind == MessageKind::ServerHello {
                return PacketId::ServerHello;
            }

            let serialized = text.data.serialize();
            let first_line = serialized.lines().next().unwrap_or_default();
            for (kind, pattern, id) in TEXT_PATTERNS {
                let hit = match kind {
                    TextMatch::Exact => first_line == *pattern,
                    TextMatch::Prefix => first_line.starts_with(pattern),
                };
                if hit {
                    return *id;
                }
            }
            PacketId::Unknown
        }
        Payload::Game(game) => game
            .header
            .kind()
            .and_then(|packet_type| {
                GAME_PACKET_IDS
                    .iter()
                    .find(|(candidate, _)| *candidate == packet_type)
                    .map(|(_, id)| *id)
            })
            .unwrap_or(PacketId::Unknown),
        Payload::Variant(variant) => variant
            .variant
            .function_name()
            .and_then(|name| {
                VARIANT_FUNCTIONS
                    .iter()
                    .find(|(candidate, _)| *candidate == name)
                    .map(|(_, id)| *id)
            })
            .unwrap_or(PacketId::Unknown),
    }
}
