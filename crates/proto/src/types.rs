//! Message kinds, game packet type codes, and the update packet header.

use crate::bytestream::{ByteReader, ByteWriter};
use bitflags::bitflags;

/// Top-level message discriminator, the first `u32` of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Handshake greeting sent by the server right after connect.
    ServerHello = 1,
    /// Text frame, typically client actions like `action|join_request`.
    GenericText = 2,
    /// Text frame used for the remaining `key|value` traffic.
    GameMessage = 3,
    /// Binary frame carrying a [`GameUpdatePacket`].
    GamePacket = 4,
    /// Error report.
    Error = 5,
    /// Analytics tracking blob.
    Track = 6,
    /// Server asking the client to upload its log.
    ClientLogRequest = 7,
    /// Client log upload.
    ClientLogResponse = 8,
}

impl MessageKind {
    /// Map the wire discriminator, `None` for values never seen on the wire.
    pub const fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::ServerHello,
            2 => Self::GenericText,
            3 => Self::GameMessage,
            4 => Self::GamePacket,
            5 => Self::Error,
            6 => Self::Track,
            7 => Self::ClientLogRequest,
            8 => Self::ClientLogResponse,
            _ => return None,
        })
    }
}

/// Game packet type codes, the first byte of a [`GameUpdatePacket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PacketType {
    State = 0,
    CallFunction = 1,
    UpdateStatus = 2,
    TileChangeRequest = 3,
    SendMapData = 4,
    SendTileUpdateData = 5,
    SendTileUpdateDataMultiple = 6,
    TileActivateRequest = 7,
    TileApplyDamage = 8,
    SendInventoryState = 9,
    ItemActivateRequest = 10,
    ItemActivateObjectRequest = 11,
    SendTileTreeState = 12,
    ModifyItemInventory = 13,
    ItemChangeObject = 14,
    SendLock = 15,
    SendItemDatabaseData = 16,
    SendParticleEffect = 17,
    SetIconState = 18,
    ItemEffect = 19,
    SetCharacterState = 20,
    PingReply = 21,
    PingRequest = 22,
    GotPunched = 23,
    AppCheckResponse = 24,
    AppIntegrityFail = 25,
    Disconnect = 26,
    BattleJoin = 27,
    BattleEvent = 28,
    UseDoor = 29,
    SendParental = 30,
    GoneFishin = 31,
    Steam = 32,
    PetBattle = 33,
    Npc = 34,
    Special = 35,
    SendParticleEffectV2 = 36,
    ActiveArrowToItem = 37,
    SelectTileIndex = 38,
    SendPlayerTributeData = 39,
    FtueSetItemToQuickInventory = 40,
    PveNpc = 41,
    PvpCardBattle = 42,
    PveApplyPlayerDamage = 43,
    PveNpcPositionDamage = 44,
    SetExtraMods = 45,
    OnStepOnTileMod = 46,
}

impl PacketType {
    /// Map a raw type byte, `None` for codes this build does not know.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::State,
            1 => Self::CallFunction,
            2 => Self::UpdateStatus,
            3 => Self::TileChangeRequest,
            4 => Self::SendMapData,
            5 => Self::SendTileUpdateData,
            6 => Self::SendTileUpdateDataMultiple,
            7 => Self::TileActivateRequest,
            8 => Self::TileApplyDamage,
            9 => Self::SendInventoryState,
            10 => Self::ItemActivateRequest,
            11 => Self::ItemActivateObjectRequest,
            12 => Self::SendTileTreeState,
            13 => Self::ModifyItemInventory,
            14 => Self::ItemChangeObject,
            15 => Self::SendLock,
            16 => Self::SendItemDatabaseData,
            17 => Self::SendParticleEffect,
            18 => Self::SetIconState,
            19 => Self::ItemEffect,
            20 => Self::SetCharacterState,
            21 => Self::PingReply,
            22 => Self::PingRequest,
            23 => Self::GotPunched,
            24 => Self::AppCheckResponse,
            25 => Self::AppIntegrityFail,
            26 => Self::Disconnect,
            27 => Self::BattleJoin,
            28 => Self::BattleEvent,
            29 => Self::UseDoor,
            30 => Self::SendParental,
            31 => Self::GoneFishin,
            32 => Self::Steam,
            33 => Self::PetBattle,
            34 => Self::Npc,
            35 => Self::Special,
            36 => Self::SendParticleEffectV2,
            37 => Self::ActiveArrowToItem,
            38 => Self::SelectTileIndex,
            39 => Self::SendPlayerTributeData,
            40 => Self::FtueSetItemToQuickInventory,
            41 => Self::PveNpc,
            42 => Self::PvpCardBattle,
            43 => Self::PveApplyPlayerDamage,
            44 => Self::PveNpcPositionDamage,
            45 => Self::SetExtraMods,
            46 => Self::OnStepOnTileMod,
            _ => return None,
        })
    }
}

bitflags! {
    /// Flag bits at offset 12 of the update packet header.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PacketFlags: u32 {
        /// Unidentified bit set by the client on some state updates.
        const UNK = 1 << 1;
        /// Reset the avatar visual state.
        const RESET_VISUAL_STATE = 1 << 2;
        /// An extended data blob follows the 56-byte header.
        const EXTENDED = 1 << 3;
        /// Avatar faces left.
        const ROTATE_LEFT = 1 << 4;
        /// Avatar is standing on something solid.
        const ON_SOLID = 1 << 5;
        /// Avatar is taking fire damage.
        const ON_FIRE_DAMAGE = 1 << 6;
        /// Avatar jumped.
        const ON_JUMP = 1 << 7;
        /// Avatar died.
        const ON_KILLED = 1 << 8;
        /// Avatar punched.
        const ON_PUNCHED = 1 << 9;
        /// Avatar placed a tile.
        const ON_PLACED = 1 << 10;
        /// Avatar triggered a tile action.
        const ON_TILE_ACTION = 1 << 11;
        /// Avatar got punched.
        const ON_GOT_PUNCHED = 1 << 12;
        /// Avatar respawned.
        const ON_RESPAWNED = 1 << 13;
        /// Avatar collected a world object.
        const ON_COLLECT_OBJECT = 1 << 14;
        /// Avatar bounced on a trampoline.
        const ON_TRAMPOLINE = 1 << 15;
        /// Avatar took damage.
        const ON_DAMAGE = 1 << 16;
        /// Avatar is sliding.
        const ON_SLIDE = 1 << 17;
        /// Avatar is wall-hanging.
        const ON_WALL_HANG = 1 << 21;
        /// Avatar is taking acid damage.
        const ON_ACID_DAMAGE = 1 << 26;
    }
}

/// The 56-byte header of every game packet frame.
///
/// Several fields are reused across packet types: `net_id` doubles as the
/// object change type, `int_data` holds an item id, tile damage, or the
/// decompressed size of the extended blob depending on `packet_type`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameUpdatePacket {
    /// Raw type byte, see [`PacketType`]. Kept raw so unknown codes survive
    /// a decode and re-encode unchanged.
    pub packet_type: u8,
    /// Unidentified byte at offset 1.
    pub unk1: u8,
    /// Unidentified byte at offset 2.
    pub unk2: u8,
    /// Unidentified byte at offset 3.
    pub unk3: u8,
    /// Avatar net id, or the object change type for object updates.
    pub net_id: i32,
    /// Secondary net id, usually the affected world object.
    pub item_net_id: i32,
    /// Flag bits, see [`PacketFlags`].
    pub flags: PacketFlags,
    /// Object or item amount.
    pub object_amount: u32,
    /// Item id, tile damage, or decompressed size of the extended blob.
    pub int_data: u32,
    /// Avatar x position in world pixels.
    pub pos_x: f32,
    /// Avatar y position in world pixels.
    pub pos_y: f32,
    /// Velocity x component.
    pub vec2_x: f32,
    /// Velocity y component.
    pub vec2_y: f32,
    /// Particle spawn rotation.
    pub particle_rotation: f32,
    /// Tile x coordinate.
    pub int_x: i32,
    /// Tile y coordinate.
    pub int_y: i32,
    /// Byte count of the extended blob that follows the header.
    pub data_size: u32,
}

impl GameUpdatePacket {
    /// Encoded size of the header.
    pub const WIRE_SIZE: usize = 56;

    /// Interpreted type byte, `None` for unknown codes.
    pub fn kind(&self) -> Option<PacketType> {
        PacketType::from_u8(self.packet_type)
    }

    /// Decode a header, `None` when fewer than 56 bytes remain.
    pub fn decode(reader: &mut ByteReader<'_>) -> Option<Self> {
        if reader.remaining_len() < Self::WIRE_SIZE {
            return None;
        }

        Some(Self {
            packet_type: reader.read_u8()?,
            unk1: reader.read_u8()?,
            unk2: reader.read_u8()?,
            unk3: reader.read_u8()?,
            net_id: reader.read_i32()?,
            item_net_id: reader.read_i32()?,
            flags: PacketFlags::from_bits_retain(reader.read_u32()?),
            object_amount: reader.read_u32()?,
            int_data: reader.read_u32()?,
            pos_x: reader.read_f32()?,
            pos_y: reader.read_f32()?,
            vec2_x: reader.read_f32()?,
            vec2_y: reader.read_f32()?,
            particle_rotation: reader.read_f32()?,
            int_x: reader.read_i32()?,
            int_y: reader.read_i32()?,
            data_size: reader.read_u32()?,
        })
    }

    /// Append the 56-byte encoding.
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.packet_type);
        writer.write_u8(self.unk1);
        writer.write_u8(self.unk2);
        writer.write_u8(self.unk3);
        writer.write_i32(self.net_id);
        writer.write_i32(self.item_net_id);
        writer.write_u32(self.flags.bits());
        writer.write_u32(self.object_amount);
        writer.write_u32(self.int_data);
        writer.write_f32(self.pos_x);
        writer.write_f32(self.pos_y);
        writer.write_f32(self.vec2_x);
        writer.write_f32(self.vec2_y);
        writer.write_f32(self.particle_rotation);
        writer.write_i32(self.int_x);
        writer.write_i32(self.int_y);
        writer.write_u32(self.data_size);
    }
}
