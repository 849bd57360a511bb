//! Typed text packets.

use crate::payload::{Payload, TextPayload};
use crate::text::TextParse;
use crate::types::MessageKind;

/// Handshake greeting the server sends right after the ENet connect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerHello;

impl ServerHello {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(_) = payload else {
            return None;
        };
        Some(Self)
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Text(TextPayload::server_hello())
    }
}

/// Client leaves the current world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quit;

impl Quit {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(_) = payload else {
            return None;
        };
        Some(Self)
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add("action", "quit");
        Payload::Text(TextPayload::new(MessageKind::GameMessage, parse))
    }
}

/// Client exits back to the world list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuitToExit;

impl QuitToExit {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(_) = payload else {
            return None;
        };
        Some(Self)
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add("action", "quit_to_exit");
        Payload::Text(TextPayload::new(MessageKind::GameMessage, parse))
    }
}

/// Client asks to enter a world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRequest {
    /// Requested world name.
    pub world_name: String,
    /// Set when the join came from a world invite.
    pub invited_world: bool,
}

impl JoinRequest {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(text) = payload else {
            return None;
        };

        Some(Self {
            world_name: text.data.get("name", 0).unwrap_or_default().to_string(),
            invited_world: text.data.get("invitedWorld", 0) == Some("1"),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add("action", "join_request");
        parse.add("name", &self.world_name);
        parse.add("invitedWorld", if self.invited_world { "1" } else { "0" });
        Payload::Text(TextPayload::new(MessageKind::GameMessage, parse))
    }
}

/// Client asks the server to re-validate the current world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateWorld {
    /// World the client believes it is in.
    pub world_name: String,
}

impl ValidateWorld {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(text) = payload else {
            return None;
        };

        Some(Self {
            world_name: text.data.get("name", 0).unwrap_or_default().to_string(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add("action", "validate_world");
        parse.add("name", &self.world_name);
        Payload::Text(TextPayload::new(MessageKind::GameMessage, parse))
    }
}

/// Chat or command input typed by the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Input {
    /// The typed text.
    pub text: String,
}

impl Input {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(text) = payload else {
            return None;
        };

        Some(Self {
            text: text.data.get("text", 0).unwrap_or_default().to_string(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add("action", "input");
        // The client sends the text token without a key, keep that shape.
        parse.add_list("", vec!["text".to_string(), self.text.clone()]);
        Payload::Text(TextPayload::new(MessageKind::GenericText, parse))
    }
}

/// Client log line relayed to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    /// The logged message.
    pub msg: String,
}

impl Log {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Text(text) = payload else {
            return None;
        };

        Some(Self {
            msg: text.data.get("msg", 0).unwrap_or_default().to_string(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add("action", "log");
        parse.add("msg", &self.msg);
        Payload::Text(TextPayload::new(MessageKind::GameMessage, parse))
    }
}
