//! Decoded message bodies, one level below typed packets.
//!
//! A payload is what the decoder produces from a raw frame and what a typed
//! packet's `write` produces on the way back out. [`Payload::encode`] is the
//! single place frames are put back on the wire.

use crate::bytestream::ByteWriter;
use crate::text::TextParse;
use crate::types::{GameUpdatePacket, MessageKind, PacketFlags, PacketType};
use crate::variant::PacketVariant;

/// Body of a text frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPayload {
    /// Which of the text message kinds this is.
    pub kind: MessageKind,
    /// Parsed `key|value` lines.
    pub data: TextParse,
}

impl TextPayload {
    /// Text payload with the given kind and lines.
    pub fn new(kind: MessageKind, data: TextParse) -> Self {
        Self { kind, data }
    }

    /// The empty handshake greeting.
    pub fn server_hello() -> Self {
        Self::new(MessageKind::ServerHello, TextParse::new())
    }
}

/// Body of a game packet frame that is not an RPC call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamePayload {
    /// The 56-byte header.
    pub header: GameUpdatePacket,
    /// Extended blob following the header, empty when none.
    pub extra: Vec<u8>,
}

impl GamePayload {
    /// Game payload from a decoded header and its trailing bytes.
    pub fn new(header: GameUpdatePacket, extra: Vec<u8>) -> Self {
        Self { header, extra }
    }
}

/// Body of a `CallFunction` game packet frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPayload {
    /// The 56-byte header the variant list arrived under.
    pub header: GameUpdatePacket,
    /// The RPC argument list.
    pub variant: PacketVariant,
}

impl VariantPayload {
    /// Variant payload under a fresh header.
    ///
    /// The header is the one the client expects for locally minted RPC
    /// calls: `net_id` and `int_data` both read as -1.
    pub fn new(variant: PacketVariant) -> Self {
        let header = GameUpdatePacket {
            packet_type: PacketType::CallFunction as u8,
            net_id: -1,
            int_data: u32::MAX,
            ..Default::default()
        };
        Self { header, variant }
    }

    /// Variant payload that keeps the header it was decoded with.
    pub fn with_header(header: GameUpdatePacket, variant: PacketVariant) -> Self {
        Self { header, variant }
    }
}

/// Any decoded message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Text frame.
    Text(TextPayload),
    /// Plain game packet frame.
    Game(GamePayload),
    /// RPC game packet frame.
    Variant(VariantPayload),
}

impl From<TextPayload> for Payload {
    fn from(payload: TextPayload) -> Self {
        Self::Text(payload)
    }
}

impl From<GamePayload> for Payload {
    fn from(payload: GamePayload) -> Self {
        Self::Game(payload)
    }
}

impl From<VariantPayload> for Payload {
    fn from(payload: VariantPayload) -> Self {
        Self::Variant(payload)
    }
}

impl Payload {
    /// The wire discriminator this payload encodes under.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text(text) => text.kind,
            Self::Game(_) | Self::Variant(_) => MessageKind::GamePacket,
        }
    }

    /// Encode the payload into a complete frame.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => {
                let body = text.data.serialize();
                let mut writer = ByteWriter::with_capacity(4 + body.len() + 1);
                writer.write_u32(text.kind as u32);
                writer.write_bytes(body.as_bytes());
                writer.write_u8(0);
                writer.into_inner()
            }
            Self::Game(game) => encode_game(game.header, &game.extra),
            Self::Variant(variant) => {
                let mut header = variant.header;
                header.packet_type = PacketType::CallFunction as u8;
                encode_game(header, &variant.variant.serialize())
            }
        }
    }
}

fn encode_game(mut header: GameUpdatePacket, extra: &[u8]) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(4 + GameUpdatePacket::WIRE_SIZE + extra.len());
    writer.write_u32(MessageKind::GamePacket as u32);
    if !extra.is_empty() {
        header.flags |= PacketFlags::EXTENDED;
        header.data_size = extra.len() as u32;
    }
    header.encode(&mut writer);
    writer.write_bytes(extra);
    writer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::VariantValue;

    #[test]
    fn test_text_payload_encoding() {
        let mut data = TextParse::new();
        data.add("action", "quit");
        let payload = Payload::Text(TextPayload::new(MessageKind::GameMessage, data));

        let frame = payload.encode();
        assert_eq!(&frame[..4], &3u32.to_le_bytes());
        assert_eq!(&frame[4..], b"action|quit\0");
    }

    #[test]
    fn test_server_hello_is_bare() {
        let frame = Payload::Text(TextPayload::server_hello()).encode();
        assert_eq!(frame, vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_game_payload_extra_fixup() {
        let header = GameUpdatePacket {
            packet_type: PacketType::SendMapData as u8,
            net_id: -1,
            ..Default::default()
        };
        let extra = vec![0xAB; 10];
        let frame = Payload::Game(GamePayload::new(header, extra.clone())).encode();

        assert_eq!(&frame[..4], &4u32.to_le_bytes());
        assert_eq!(frame.len(), 4 + GameUpdatePacket::WIRE_SIZE + extra.len());

        let mut reader = crate::bytestream::ByteReader::new(&frame[4..]);
        let decoded = GameUpdatePacket::decode(&mut reader).expect("header");
        assert!(decoded.flags.contains(PacketFlags::EXTENDED));
        assert_eq!(decoded.data_size, extra.len() as u32);
        assert_eq!(reader.read_bytes(extra.len()).expect("extra"), &extra[..]);
    }

    #[test]
    fn test_game_payload_without_extra_keeps_header() {
        let header = GameUpdatePacket {
            packet_type: PacketType::PingRequest as u8,
            int_data: 1234,
            ..Default::default()
        };
        let frame = Payload::Game(GamePayload::new(header, Vec::new())).encode();
        assert_eq!(frame.len(), 4 + GameUpdatePacket::WIRE_SIZE);

        let mut reader = crate::bytestream::ByteReader::new(&frame[4..]);
        let decoded = GameUpdatePacket::decode(&mut reader).expect("header");
        assert!(!decoded.flags.contains(PacketFlags::EXTENDED));
        assert_eq!(decoded.int_data, 1234);
    }

    #[test]
    fn test_variant_payload_forces_call_function() {
        let header = GameUpdatePacket {
            packet_type: PacketType::State as u8,
            net_id: 42,
            ..Default::default()
        };
        let variant =
            PacketVariant::from_values(vec![VariantValue::Str("OnRemove".to_string())]);
        let frame = Payload::Variant(VariantPayload::with_header(header, variant.clone())).encode();

        let mut reader = crate::bytestream::ByteReader::new(&frame[4..]);
        let decoded = GameUpdatePacket::decode(&mut reader).expect("header");
        assert_eq!(decoded.kind(), Some(PacketType::CallFunction));
        assert_eq!(decoded.net_id, 42);

        let body = &frame[4 + GameUpdatePacket::WIRE_SIZE..];
        assert_eq!(PacketVariant::deserialize(body), Some(variant));
    }

    #[test]
    fn test_fresh_variant_header_defaults() {
        let payload = VariantPayload::new(PacketVariant::new());
        assert_eq!(payload.header.net_id, -1);
        assert_eq!(payload.header.int_data, u32::MAX);
        assert_eq!(payload.header.kind(), Some(PacketType::CallFunction));
    }
}
