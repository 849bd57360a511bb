//! Frame decoder turning raw bytes into typed packets.

use tracing::{debug, trace};

use crate::bytestream::ByteReader;
use crate::packets::Packet;
use crate::payload::{GamePayload, Payload, TextPayload, VariantPayload};
use crate::registry::PacketRegistry;
use crate::text::TextParse;
use crate::types::{GameUpdatePacket, MessageKind, PacketType};
use crate::variant::PacketVariant;

/// Which decoded frames get dumped to the trace log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeLog {
    /// Dump text frame bodies.
    pub print_message: bool,
    /// Dump game packet headers as hex.
    pub print_game_update_packet: bool,
    /// Dump decoded variant lists.
    pub print_variant: bool,
    /// Dump extended blobs as hex.
    pub print_extra: bool,
}

/// Decodes raw frames into payloads and typed packets.
///
/// `None` from [`PacketDecoder::decode`] means the frame could not be
/// interpreted and should be forwarded verbatim.
#[derive(Debug)]
pub struct PacketDecoder {
    registry: PacketRegistry,
    log: DecodeLog,
}

impl PacketDecoder {
    /// Decoder over the given registry.
    pub fn new(registry: PacketRegistry, log: DecodeLog) -> Self {
        Self { registry, log }
    }

    /// Decoder with the default typed roster and no frame dumps.
    pub fn with_defaults() -> Self {
        Self::new(PacketRegistry::with_defaults(), DecodeLog::default())
    }

    /// The registry packets are built from.
    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    /// Mutable registry access for custom registrations.
    pub fn registry_mut(&mut self) -> &mut PacketRegistry {
        &mut self.registry
    }

    /// Decode a frame into a typed packet.
    ///
    /// `direction` is a label for the log lines, the decoder itself is
    /// direction-agnostic.
    pub fn decode(&self, data: &[u8], direction: &str) -> Option<Packet> {
        let payload = self.decode_payload(data, direction)?;
        self.registry.create(&payload)
    }

    /// Decode a frame into a payload without building the packet.
    pub fn decode_payload(&self, data: &[u8], direction: &str) -> Option<Payload> {
        debug!("[{direction}] decoding frame of {} bytes", data.len());

        let mut reader = ByteReader::new(data);
        let kind = MessageKind::from_u32(reader.read_u32()?)?;

        match kind {
            MessageKind::ServerHello => {
                debug!("[{direction}] received server hello");
                Some(Payload::Text(TextPayload::server_hello()))
            }
            MessageKind::GenericText | MessageKind::GameMessage => {
                // The body ends with a NUL byte, drop it.
                let body_len = reader.remaining_len().saturating_sub(1);
                let body = reader.read_bytes(body_len)?;
                let message = String::from_utf8_lossy(body);
                let parser = TextParse::parse(&message);

                if self.log.print_message {
                    trace!(
                        "[{direction}] {kind:?} ({} bytes):\n{}",
                        message.len(),
                        parser.serialize()
                    );
                }

                Some(Payload::Text(TextPayload::new(kind, parser)))
            }
            MessageKind::GamePacket => {
                let header = GameUpdatePacket::decode(&mut reader)?;
                let remaining = reader.remaining_len();
                let extra = reader.read_bytes(remaining)?.to_vec();

                match header.kind() {
                    Some(packet_type) => {
                        debug!("[{direction}] game packet with type {packet_type:?}");
                    }
                    None => {
                        debug!(
                            "[{direction}] game packet with unknown type {}",
                            header.packet_type
                        );
                    }
                }

                if self.log.print_game_update_packet {
                    trace!(
                        "[{direction}] game packet header: {:02x?}",
                        &data[4..4 + GameUpdatePacket::WIRE_SIZE]
                    );
                }

                if header.kind() == Some(PacketType::CallFunction) {
                    let variant = PacketVariant::deserialize(&extra)?;
                    if self.log.print_variant {
                        trace!("[{direction}] {variant:?}");
                    }
                    return Some(Payload::Variant(VariantPayload::with_header(header, variant)));
                }

                if self.log.print_extra && extra.len() > 1 {
                    trace!("[{direction}] extra data: {:02x?}", extra);
                }

                Some(Payload::Game(GamePayload::new(header, extra)))
            }
            // Error, Track, and the log exchange are never interpreted.
            _ => None,
        }
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PacketId;
    use crate::variant::VariantValue;

    fn decoder() -> PacketDecoder {
        PacketDecoder::with_defaults()
    }

    #[test]
    fn test_decode_quit() {
        let mut parse = TextParse::new();
        parse.add("action", "quit");
        let frame = Payload::Text(TextPayload::new(MessageKind::GameMessage, parse)).encode();

        let packet = decoder().decode(&frame, "test").expect("packet");
        assert!(matches!(packet, Packet::Quit(_)));
    }

    #[test]
    fn test_decode_server_hello() {
        let frame = Payload::Text(TextPayload::server_hello()).encode();
        let packet = decoder().decode(&frame, "test").expect("packet");
        assert!(matches!(packet, Packet::ServerHello(_)));
    }

    #[test]
    fn test_decode_tile_change_request() {
        let frame = Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::TileChangeRequest as u8,
                item_net_id: 18,
                int_x: 4,
                int_y: 9,
                ..Default::default()
            },
            Vec::new(),
        ))
        .encode();

        let Some(Packet::TileChangeRequest(packet)) = decoder().decode(&frame, "test") else {
            panic!("expected tile change request");
        };
        assert_eq!((packet.int_x, packet.int_y, packet.item_id), (4, 9, 18));
    }

    #[test]
    fn test_decode_on_spawn() {
        let variant = PacketVariant::from_values(vec![
            VariantValue::Str("OnSpawn".to_string()),
            VariantValue::Str("spawn|avatar\nnetID|2\ntype|local".to_string()),
        ]);
        let frame = Payload::Variant(VariantPayload::new(variant)).encode();

        let Some(Packet::OnSpawn(packet)) = decoder().decode(&frame, "test") else {
            panic!("expected spawn");
        };
        assert_eq!(packet.net_id, 2);
        assert!(packet.is_local());
    }

    #[test]
    fn test_unclaimed_frames_become_generics() {
        let text = Payload::Text(TextPayload::new(
            MessageKind::GenericText,
            TextParse::parse("requestedName|gt"),
        ))
        .encode();
        let Some(packet) = decoder().decode(&text, "test") else {
            panic!("expected packet");
        };
        assert!(matches!(packet, Packet::GenericText(_)));
        assert_eq!(packet.id(), PacketId::Unknown);

        let game = Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::PingRequest as u8,
                ..Default::default()
            },
            Vec::new(),
        ))
        .encode();
        assert!(matches!(
            decoder().decode(&game, "test"),
            Some(Packet::GenericGame(_))
        ));

        let variant = Payload::Variant(VariantPayload::new(PacketVariant::from_values(vec![
            VariantValue::Str("OnConsoleMessage".to_string()),
        ])))
        .encode();
        assert!(matches!(
            decoder().decode(&variant, "test"),
            Some(Packet::GenericVariant(_))
        ));
    }

    #[test]
    fn test_undecodable_frames_return_none() {
        let decoder = decoder();

        // Unknown discriminator.
        assert!(decoder.decode(&9u32.to_le_bytes(), "test").is_none());

        // Kinds never interpreted.
        assert!(decoder.decode(&5u32.to_le_bytes(), "test").is_none());

        // Too short for a discriminator.
        assert!(decoder.decode(&[4, 0], "test").is_none());

        // Game packet frame shorter than its header.
        let mut truncated = 4u32.to_le_bytes().to_vec();
        truncated.extend_from_slice(&[0; GameUpdatePacket::WIRE_SIZE - 10]);
        assert!(decoder.decode(&truncated, "test").is_none());

        // RPC frame whose variant list does not parse.
        let garbage = Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::CallFunction as u8,
                ..Default::default()
            },
            vec![9, 9, 9],
        ))
        .encode();
        assert!(decoder.decode(&garbage, "test").is_none());
    }
}
