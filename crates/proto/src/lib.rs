#![warn(missing_docs)]
//! Wire protocol model: frame decoding, typed packets, and re-encoding.

pub mod bytestream;
pub mod decoder;
pub mod id;
pub mod packets;
pub mod payload;
pub mod registry;
pub mod text;
pub mod types;
pub mod variant;

// Re-export the types most of the workspace touches
pub use bytestream::{ByteReader, ByteWriter};
pub use decoder::{DecodeLog, PacketDecoder};
pub use id::{derive_packet_id, PacketId};
pub use packets::Packet;
pub use payload::{GamePayload, Payload, TextPayload, VariantPayload};
pub use registry::{PacketFactory, PacketRegistry};
pub use text::TextParse;
pub use types::{GameUpdatePacket, MessageKind, PacketFlags, PacketType};
pub use variant::{PacketVariant, VariantValue};
