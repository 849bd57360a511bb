//! Typed game packets built on the 56-byte update header.

use tracing::warn;

use crate::payload::{GamePayload, Payload};
use crate::types::{GameUpdatePacket, PacketType};

/// Server kicks the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disconnect;

impl Disconnect {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(_) = payload else {
            return None;
        };
        Some(Self)
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::Disconnect as u8,
                net_id: -1,
                ..Default::default()
            },
            Vec::new(),
        ))
    }
}

/// World tile map download, carried opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMapData {
    /// Serialized world map.
    pub extra: Vec<u8>,
}

impl SendMapData {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };
        Some(Self {
            extra: game.extra.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::SendMapData as u8,
                net_id: -1,
                ..Default::default()
            },
            self.extra.clone(),
        ))
    }
}

/// Single tile update, carried opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendTileUpdateData {
    /// Serialized tile.
    pub extra: Vec<u8>,
}

impl SendTileUpdateData {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };
        Some(Self {
            extra: game.extra.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::SendTileUpdateData as u8,
                net_id: -1,
                ..Default::default()
            },
            self.extra.clone(),
        ))
    }
}

/// Inventory snapshot, carried opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendInventoryState {
    /// Serialized inventory.
    pub extra: Vec<u8>,
}

impl SendInventoryState {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };
        Some(Self {
            extra: game.extra.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::SendInventoryState as u8,
                net_id: -1,
                ..Default::default()
            },
            self.extra.clone(),
        ))
    }
}

/// Compressed `items.dat` download.
///
/// The extended blob is zlib, `int_data` in the header carries the
/// decompressed size. `read` hands back the inflated file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendItemDatabaseData {
    /// The inflated `items.dat` contents.
    pub items_dat: Vec<u8>,
}

impl SendItemDatabaseData {
    /// Build from a decoded payload, inflating the blob.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };

        if game.extra.is_empty() {
            return None;
        }

        let decompressed_size = game.header.int_data;
        if decompressed_size == 0 {
            return None;
        }

        let items_dat = decompress_zlib(&game.extra, decompressed_size)?;
        Some(Self { items_dat })
    }

    /// Produce the payload to put back on the wire, deflating the file.
    pub fn write(&self) -> Payload {
        let mut header = GameUpdatePacket {
            packet_type: PacketType::SendItemDatabaseData as u8,
            net_id: -1,
            ..Default::default()
        };

        let extra = match compress_zlib(&self.items_dat) {
            Ok(compressed) => {
                header.int_data = self.items_dat.len() as u32;
                compressed
            }
            Err(err) => {
                warn!("failed to compress items.dat data: {err}");
                Vec::new()
            }
        };

        Payload::Game(GamePayload::new(header, extra))
    }
}

/// Inventory delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyItemInventory {
    /// Affected item.
    pub item_id: i32,
    /// Amount added or removed.
    pub amount: i32,
    /// Avatar the change applies to.
    pub net_id: i32,
}

impl Default for ModifyItemInventory {
    fn default() -> Self {
        Self {
            item_id: 0,
            amount: 0,
            net_id: -1,
        }
    }
}

impl ModifyItemInventory {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };

        Some(Self {
            item_id: game.header.int_data as i32,
            amount: game.header.object_amount as i32,
            net_id: game.header.net_id,
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::ModifyItemInventory as u8,
                net_id: self.net_id,
                object_amount: self.amount as u32,
                int_data: self.item_id as u32,
                ..Default::default()
            },
            Vec::new(),
        ))
    }
}

/// Client punches or places a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileChangeRequest {
    /// Tile x coordinate.
    pub int_x: i32,
    /// Tile y coordinate.
    pub int_y: i32,
    /// Item used on the tile, 18 for the fist.
    pub item_id: i32,
}

impl TileChangeRequest {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };

        Some(Self {
            int_x: game.header.int_x,
            int_y: game.header.int_y,
            item_id: game.header.item_net_id,
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::TileChangeRequest as u8,
                item_net_id: self.item_id,
                int_x: self.int_x,
                int_y: self.int_y,
                ..Default::default()
            },
            Vec::new(),
        ))
    }
}

/// World object spawn, pickup, or modification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemChangeObject {
    /// Object x position in tiles.
    pub pos_x: u16,
    /// Object y position in tiles.
    pub pos_y: u16,
    /// Item the object represents.
    pub item_id: u16,
    /// Stack size.
    pub amount: u16,
    /// What happened to the object.
    pub object_change_type: u8,
    /// Object id within the world.
    pub item_net_id: u16,
}

impl ItemChangeObject {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };

        Some(Self {
            pos_x: game.header.int_x as u16,
            pos_y: game.header.int_y as u16,
            item_id: game.header.int_data as u16,
            amount: game.header.object_amount as u16,
            object_change_type: game.header.net_id as u8,
            item_net_id: game.header.item_net_id as u16,
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::ItemChangeObject as u8,
                net_id: self.object_change_type as i32,
                item_net_id: self.item_net_id as i32,
                object_amount: self.amount as u32,
                int_data: self.item_id as u32,
                int_x: self.pos_x as i32,
                int_y: self.pos_y as i32,
                ..Default::default()
            },
            Vec::new(),
        ))
    }
}

fn compress_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn decompress_zlib(data: &[u8], expected_size: u32) -> Option<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size as usize);
    decoder.read_to_end(&mut decompressed).ok()?;

    if decompressed.len() != expected_size as usize {
        warn!(
            "decompressed size ({}) != expected size ({})",
            decompressed.len(),
            expected_size
        );
        return None;
    }

    Some(decompressed)
}
