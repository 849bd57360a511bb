//! Typed RPC packets carried in `CallFunction` variant lists.

use glam::{IVec2, IVec4};

use crate::id::SUPER_MAIN_START_FUNCTION;
use crate::payload::{Payload, VariantPayload};
use crate::text::TextParse;
use crate::types::GameUpdatePacket;
use crate::variant::{PacketVariant, VariantValue};

/// Server redirect to a world-serving host.
///
/// Argument 4 packs the address, door id, and UUID token into one
/// `address|door_id|uuid_token` line. Servers older than the login
/// rework omit arguments 5 and 6.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnSendToServer {
    /// Destination port.
    pub port: u16,
    /// Session token to present on the new host.
    pub token: i32,
    /// User id.
    pub user: i32,
    /// Destination hostname or IP.
    pub address: String,
    /// Door the avatar entered through.
    pub door_id: String,
    /// One-shot login token.
    pub uuid_token: String,
    /// Login mode.
    pub login_mode: u8,
    /// Account name.
    pub username: String,
}

impl OnSendToServer {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Variant(var) = payload else {
            return None;
        };

        let variant = &var.variant;
        if variant.len() < 5 {
            return None;
        }

        let port = variant.get_i32(1)? as u16;
        let token = variant.get_i32(2)?;
        let user = variant.get_i32(3)?;

        let raw_text = variant.get_str(4)?;
        let key = raw_text.split('|').next().unwrap_or_default().to_string();
        let parse = TextParse::parse(raw_text);

        Some(Self {
            port,
            token,
            user,
            door_id: parse.get(&key, 0).unwrap_or_default().to_string(),
            uuid_token: parse.get(&key, 1).unwrap_or_default().to_string(),
            address: key,
            login_mode: variant.get_u32(5).unwrap_or(0) as u8,
            username: variant.get_str(6).unwrap_or_default().to_string(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parse = TextParse::new();
        parse.add_list(
            &self.address,
            vec![self.door_id.clone(), self.uuid_token.clone()],
        );

        let variant = PacketVariant::from_values(vec![
            VariantValue::Str("OnSendToServer".to_string()),
            VariantValue::Signed(self.port as i32),
            VariantValue::Signed(self.token),
            VariantValue::Signed(self.user),
            VariantValue::Str(parse.serialize()),
            VariantValue::Unsigned(self.login_mode as u32),
            VariantValue::Str(self.username.clone()),
        ]);

        Payload::Variant(VariantPayload::new(variant))
    }
}

/// Post-logon bootstrap call.
///
/// The full argument list is kept so the frame can be forwarded without
/// re-deriving arguments this proxy does not interpret. Only the item
/// database hash is pulled out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnSuperMainStart {
    /// Header the call arrived under.
    pub header: GameUpdatePacket,
    /// The complete argument list.
    pub variant: PacketVariant,
    /// Proton hash of the server's `items.dat`.
    pub item_hash: u32,
}

impl OnSuperMainStart {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Variant(var) = payload else {
            return None;
        };

        if var.variant.len() < 2 {
            return None;
        }

        Some(Self {
            header: var.header,
            item_hash: var.variant.get_u32(1)?,
            variant: var.variant.clone(),
        })
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        Payload::Variant(VariantPayload::with_header(self.header, self.variant.clone()))
    }
}

/// Avatar spawn.
///
/// Argument 1 is a `key|value` blob describing the avatar. The entry
/// `type|local` marks the session's own avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct OnSpawn {
    /// Header the call arrived under.
    pub header: GameUpdatePacket,
    /// Spawn kind.
    pub spawn: String,
    /// Net id assigned to the avatar.
    pub net_id: i32,
    /// Account user id.
    pub user_id: i32,
    /// Two-letter country code.
    pub country_code: String,
    /// Display name.
    pub name: String,
    /// Spawn position in world pixels.
    pub position: IVec2,
    /// Collision rectangle.
    pub collision: IVec4,
    /// Invisibility state.
    pub invisible: i32,
    /// Moderator state.
    pub mod_state: i32,
    /// Super moderator state.
    pub supermod_state: i32,
    /// Online id.
    pub online_id: i32,
    /// Avatar kind, `local` for the session's own avatar.
    pub player_type: String,
    /// Title icon path.
    pub title_icon: String,
}

impl Default for OnSpawn {
    fn default() -> Self {
        Self {
            header: GameUpdatePacket::default(),
            spawn: String::new(),
            net_id: -1,
            user_id: 0,
            country_code: String::new(),
            name: String::new(),
            position: IVec2::ZERO,
            collision: IVec4::ZERO,
            invisible: 0,
            mod_state: 0,
            supermod_state: 0,
            online_id: 0,
            player_type: String::new(),
            title_icon: String::new(),
        }
    }
}

impl OnSpawn {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Variant(var) = payload else {
            return None;
        };

        if var.variant.len() < 2 {
            return None;
        }

        let parser = TextParse::parse(var.variant.get_str(1).unwrap_or_default());

        Some(Self {
            header: var.header,
            spawn: parser.get("spawn", 0).unwrap_or_default().to_string(),
            net_id: parser.get_parsed("netID", 0).unwrap_or_default(),
            user_id: parser.get_parsed("userID", 0).unwrap_or_default(),
            country_code: parser.get("country", 0).unwrap_or_default().to_string(),
            name: parser.get("name", 0).unwrap_or_default().to_string(),
            position: IVec2::new(
                parser.get_parsed("posXY", 0).unwrap_or_default(),
                parser.get_parsed("posXY", 1).unwrap_or_default(),
            ),
            collision: IVec4::new(
                parser.get_parsed("colrect", 0).unwrap_or_default(),
                parser.get_parsed("colrect", 1).unwrap_or_default(),
                parser.get_parsed("colrect", 2).unwrap_or_default(),
                parser.get_parsed("colrect", 3).unwrap_or_default(),
            ),
            invisible: parser.get_parsed("invis", 0).unwrap_or_default(),
            mod_state: parser.get_parsed("mstate", 0).unwrap_or_default(),
            supermod_state: parser.get_parsed("smstate", 0).unwrap_or_default(),
            online_id: parser.get_parsed("onlineID", 0).unwrap_or_default(),
            player_type: parser.get("type", 0).unwrap_or_default().to_string(),
            title_icon: parser.get("titleIcon", 0).unwrap_or_default().to_string(),
        })
    }

    /// Whether this spawn is the session's own avatar.
    pub fn is_local(&self) -> bool {
        self.player_type == "local"
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let mut parser = TextParse::new();
        parser.add("spawn", &self.spawn);
        parser.add("netID", self.net_id);
        parser.add("userID", self.user_id);
        parser.add("name", &self.name);
        parser.add("titleIcon", &self.title_icon);
        parser.add("country", &self.country_code);
        parser.add_list(
            "posXY",
            vec![self.position.x.to_string(), self.position.y.to_string()],
        );
        parser.add_list(
            "colrect",
            vec![
                self.collision.x.to_string(),
                self.collision.y.to_string(),
                self.collision.z.to_string(),
                self.collision.w.to_string(),
            ],
        );
        parser.add("invis", self.invisible);
        parser.add("mstate", self.mod_state);
        parser.add("smstate", self.supermod_state);
        parser.add("onlineID", "");
        parser.add("type", &self.player_type);

        let variant = PacketVariant::from_values(vec![
            VariantValue::Str("OnSpawn".to_string()),
            VariantValue::Str(parser.serialize()),
        ]);

        Payload::Variant(VariantPayload::with_header(self.header, variant))
    }
}

/// Avatar despawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnRemove {
    /// Header the call arrived under.
    pub header: GameUpdatePacket,
    /// Net id of the removed avatar.
    pub net_id: i32,
    /// Player id of the removed avatar.
    pub player_id: i32,
}

impl Default for OnRemove {
    fn default() -> Self {
        Self {
            header: GameUpdatePacket::default(),
            net_id: -1,
            player_id: 0,
        }
    }
}

impl OnRemove {
    /// Build from a decoded payload.
    pub fn read(payload: &Payload) -> Option<Self> {
        let Payload::Variant(var) = payload else {
            return None;
        };

        if var.variant.len() < 3 {
            return None;
        }

        let mut packet = Self {
            header: var.header,
            ..Default::default()
        };

        let net_id_data = TextParse::parse(var.variant.get_str(1).unwrap_or_default());
        if net_id_data.contains("netID") {
            packet.net_id = net_id_data.get_parsed("netID", 0).unwrap_or_default();
        }

        let player_id_data = TextParse::parse(var.variant.get_str(2).unwrap_or_default());
        if player_id_data.contains("pId") {
            packet.player_id = player_id_data.get_parsed("pId", 0).unwrap_or_default();
        }

        Some(packet)
    }

    /// Produce the payload to put back on the wire.
    pub fn write(&self) -> Payload {
        let variant = PacketVariant::from_values(vec![
            VariantValue::Str("OnRemove".to_string()),
            VariantValue::Str(format!("netID|{}", self.net_id)),
            VariantValue::Str(format!("pId|{}", self.player_id)),
        ]);

        Payload::Variant(VariantPayload::with_header(self.header, variant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant_payload(values: Vec<VariantValue>) -> Payload {
        Payload::Variant(VariantPayload::new(PacketVariant::from_values(values)))
    }

    #[test]
    fn test_on_send_to_server_read() {
        let payload = variant_payload(vec![
            VariantValue::Str("OnSendToServer".to_string()),
            VariantValue::Signed(17178),
            VariantValue::Signed(1234),
            VariantValue::Signed(5678),
            VariantValue::Str("213.179.209.168|door|uuid-token".to_string()),
            VariantValue::Unsigned(1),
            VariantValue::Str("player".to_string()),
        ]);

        let packet = OnSendToServer::read(&payload).expect("redirect");
        assert_eq!(packet.port, 17178);
        assert_eq!(packet.token, 1234);
        assert_eq!(packet.user, 5678);
        assert_eq!(packet.address, "213.179.209.168");
        assert_eq!(packet.door_id, "door");
        assert_eq!(packet.uuid_token, "uuid-token");
        assert_eq!(packet.login_mode, 1);
        assert_eq!(packet.username, "player");
    }

    #[test]
    fn test_on_send_to_server_short_form() {
        let payload = variant_payload(vec![
            VariantValue::Str("OnSendToServer".to_string()),
            VariantValue::Signed(17000),
            VariantValue::Signed(1),
            VariantValue::Signed(2),
            VariantValue::Str("gt.example.com||".to_string()),
        ]);

        let packet = OnSendToServer::read(&payload).expect("redirect");
        assert_eq!(packet.address, "gt.example.com");
        assert_eq!(packet.login_mode, 0);
        assert!(packet.username.is_empty());
    }

    #[test]
    fn test_on_send_to_server_rejects_truncated() {
        let payload = variant_payload(vec![
            VariantValue::Str("OnSendToServer".to_string()),
            VariantValue::Signed(17000),
        ]);
        assert!(OnSendToServer::read(&payload).is_none());
    }

    #[test]
    fn test_on_send_to_server_roundtrip() {
        let packet = OnSendToServer {
            port: 443,
            token: -7,
            user: 900,
            address: "127.0.0.1".to_string(),
            door_id: "DOOR".to_string(),
            uuid_token: "uuid".to_string(),
            login_mode: 2,
            username: "gt".to_string(),
        };
        let decoded = OnSendToServer::read(&packet.write()).expect("redirect");
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_on_super_main_start() {
        let payload = variant_payload(vec![
            VariantValue::Str(SUPER_MAIN_START_FUNCTION.to_string()),
            VariantValue::Signed(-1412567295),
            VariantValue::Str("ubistatic-a.akamaihd.net".to_string()),
        ]);

        let packet = OnSuperMainStart::read(&payload).expect("bootstrap");
        assert_eq!(packet.item_hash, -1412567295i32 as u32);

        // The forwarded frame keeps the whole argument list.
        let Payload::Variant(var) = packet.write() else {
            panic!("expected variant payload");
        };
        assert_eq!(var.variant.len(), 3);
        assert_eq!(var.variant.get_str(2), Some("ubistatic-a.akamaihd.net"));

        let short = variant_payload(vec![VariantValue::Str(
            SUPER_MAIN_START_FUNCTION.to_string(),
        )]);
        assert!(OnSuperMainStart::read(&short).is_none());
    }

    #[test]
    fn test_on_spawn_read() {
        let blob = "spawn|avatar\nnetID|5\nuserID|1000\ncolrect|0|0|20|30\n\
                    posXY|320|416\nname|gtplayer\ncountry|us\ninvis|0\nmstate|0\n\
                    smstate|0\nonlineID|\ntype|local";
        let payload = variant_payload(vec![
            VariantValue::Str("OnSpawn".to_string()),
            VariantValue::Str(blob.to_string()),
        ]);

        let packet = OnSpawn::read(&payload).expect("spawn");
        assert_eq!(packet.net_id, 5);
        assert_eq!(packet.user_id, 1000);
        assert_eq!(packet.name, "gtplayer");
        assert_eq!(packet.position, IVec2::new(320, 416));
        assert_eq!(packet.collision, IVec4::new(0, 0, 20, 30));
        assert!(packet.is_local());
    }

    #[test]
    fn test_on_spawn_write_ordering() {
        let packet = OnSpawn {
            spawn: "avatar".to_string(),
            net_id: 7,
            user_id: 42,
            name: "someone".to_string(),
            country_code: "se".to_string(),
            position: IVec2::new(10, 20),
            player_type: "remote".to_string(),
            ..Default::default()
        };

        let Payload::Variant(var) = packet.write() else {
            panic!("expected variant payload");
        };
        assert_eq!(var.variant.function_name(), Some("OnSpawn"));

        let blob = var.variant.get_str(1).expect("spawn blob");
        assert_eq!(
            blob,
            "spawn|avatar\nnetID|7\nuserID|42\nname|someone\ntitleIcon|\n\
             country|se\nposXY|10|20\ncolrect|0|0|0|0\ninvis|0\nmstate|0\n\
             smstate|0\nonlineID|\ntype|remote"
        );
    }

    #[test]
    fn test_on_remove() {
        let payload = variant_payload(vec![
            VariantValue::Str("OnRemove".to_string()),
            VariantValue::Str("netID|9".to_string()),
            VariantValue::Str("pId|77".to_string()),
        ]);

        let packet = OnRemove::read(&payload).expect("remove");
        assert_eq!(packet.net_id, 9);
        assert_eq!(packet.player_id, 77);

        let decoded = OnRemove::read(&packet.write()).expect("remove");
        assert_eq!(decoded.net_id, 9);
        assert_eq!(decoded.player_id, 77);

        let missing_args = variant_payload(vec![
            VariantValue::Str("OnRemove".to_string()),
            VariantValue::Str("netID|9".to_string()),
        ]);
        assert!(OnRemove::read(&missing_args).is_none());
    }
}
