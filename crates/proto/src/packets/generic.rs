//! Fallback packets for traffic the typed roster does not claim.
//!
//! These capture the decoded payload as-is so unclaimed frames still flow
//! through the same packet pipeline as typed ones.

use crate::payload::{GamePayload, Payload, TextPayload, VariantPayload};
use crate::text::TextParse;
use crate::types::{GameUpdatePacket, MessageKind};
use crate::variant::PacketVariant;

/// Any text frame without a typed packet.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericText {
    /// Original message kind.
    pub kind: MessageKind,
    /// Parsed lines.
    pub data: TextParse,
}

impl GenericText {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(text) = payload else {
            return None;
        };
        Some(Self {
            kind: text.kind,
            data: text.data.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Text(TextPayload::new(self.kind, self.data.clone()))
    }
}

/// Any game packet frame without a typed packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericGame {
    /// Original header.
    pub header: GameUpdatePacket,
    /// Original extended blob.
    pub extra: Vec<u8>,
}

impl GenericGame {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Game(game) = payload else {
            return None;
        };
        Some(Self {
            header: game.header,
            extra: game.extra.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Game(GamePayload::new(self.header, self.extra.clone()))
    }
}

/// Any RPC frame without a typed packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericVariant {
    /// Original header.
    pub header: GameUpdatePacket,
    /// Original argument list.
    pub variant: PacketVariant,
}

impl GenericVariant {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Variant(var) = payload else {
            return None;
        };
        Some(Self {
            header: var.header,
            variant: var.variant.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Variant(VariantPayload::with_header(self.header, self.variant.clone()))
    }
}
