//! Registry mapping packet identities to typed constructors.

use std::collections::HashMap;

use crate::id::{derive_packet_id, PacketId};
use crate::packets::{
    Disconnect, GenericGame, GenericText, GenericVariant, Input, ItemChangeObject, JoinRequest,
    Log, ModifyItemInventory, OnRemove, OnSendToServer, OnSpawn, OnSuperMainStart, Packet, Quit,
    QuitToExit, SendInventoryState, SendItemDatabaseData, SendMapData, SendTileUpdateData,
    ServerHello, TileChangeRequest, ValidateWorld,
};
use crate::payload::Payload;

/// Constructor for one typed packet.
pub type PacketFactory = fn(&Payload) -> Option<Packet>;

/// Maps packet identities to typed constructors.
///
/// [`PacketRegistry::create`] is the single entry point: payloads whose
/// identity has a registered factory become typed packets, everything else
/// becomes one of the generic fallbacks. A registered factory that rejects
/// its payload yields `None`, which callers treat as undecodable.
#[derive(Debug)]
pub struct PacketRegistry {
    factories: HashMap<PacketId, PacketFactory>,
}

impl PacketRegistry {
    /// Registry with no typed constructors.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every typed packet registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(PacketId::ServerHello, |p| {
            ServerHello::read(p).map(Packet::ServerHello)
        });

        registry.register(PacketId::Quit, |p| Quit::read(p).map(Packet::Quit));
        registry.register(PacketId::QuitToExit, |p| {
            QuitToExit::read(p).map(Packet::QuitToExit)
        });
        registry.register(PacketId::JoinRequest, |p| {
            JoinRequest::read(p).map(Packet::JoinRequest)
        });
        registry.register(PacketId::ValidateWorld, |p| {
            ValidateWorld::read(p).map(Packet::ValidateWorld)
        });
        registry.register(PacketId::Input, |p| Input::read(p).map(Packet::Input));
        registry.register(PacketId::Log, |p| Log::read(p).map(Packet::Log));

        registry.register(PacketId::Disconnect, |p| {
            Disconnect::read(p).map(Packet::Disconnect)
        });
        registry.register(PacketId::SendMapData, |p| {
            SendMapData::read(p).map(Packet::SendMapData)
        });
        registry.register(PacketId::SendTileUpdateData, |p| {
            SendTileUpdateData::read(p).map(Packet::SendTileUpdateData)
        });
        registry.register(PacketId::SendItemDatabaseData, |p| {
            SendItemDatabaseData::read(p).map(Packet::SendItemDatabaseData)
        });
        registry.register(PacketId::SendInventoryState, |p| {
            SendInventoryState::read(p).map(Packet::SendInventoryState)
        });
        registry.register(PacketId::ModifyItemInventory, |p| {
            ModifyItemInventory::read(p).map(Packet::ModifyItemInventory)
        });
        registry.register(PacketId::TileChangeRequest, |p| {
            TileChangeRequest::read(p).map(Packet::TileChangeRequest)
        });
        registry.register(PacketId::ItemChangeObject, |p| {
            ItemChangeObject::read(p).map(Packet::ItemChangeObject)
        });

        registry.register(PacketId::OnSendToServer, |p| {
            OnSendToServer::read(p).map(Packet::OnSendToServer)
        });
        registry.register(PacketId::OnSuperMainStart, |p| {
            OnSuperMainStart::read(p).map(Packet::OnSuperMainStart)
        });
        registry.register(PacketId::OnSpawn, |p| OnSpawn::read(p).map(Packet::OnSpawn));
        registry.register(PacketId::OnRemove, |p| OnRemove::read(p).map(Packet::OnRemove));

        registry
    }

    /// Register a constructor, replacing any previous one for the id.
    pub fn register(&mut self, id: PacketId, factory: PacketFactory) {
        self.factories.insert(id, factory);
    }

    /// Whether `id` has a registered constructor.
    pub fn contains(&self, id: PacketId) -> bool {
        self.factories.contains_key(&id)
    }

    /// Build the packet for a decoded payload.
    ///
    /// Returns `None` only when a typed constructor rejects the payload,
    /// identities without a constructor fall back to the generics.
    pub fn create(&self, payload: &Payload) -> Option<Packet> {
        let id = derive_packet_id(payload);
        if let Some(factory) = self.factories.get(&id) {
            return factory(payload);
        }

        match payload {
            Payload::Text(_) => GenericText::read(payload).map(Packet::GenericText),
            Payload::Game(_) => GenericGame::read(payload).map(Packet::GenericGame),
            Payload::Variant(_) => GenericVariant::read(payload).map(Packet::GenericVariant),
        }
    }
}

impl Default for PacketRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{GamePayload, TextPayload};
    use crate::text::TextParse;
    use crate::types::{GameUpdatePacket, MessageKind, PacketType};

    fn text_payload(raw: &str) -> Payload {
        Payload::Text(TextPayload::new(
            MessageKind::GameMessage,
            TextParse::parse(raw),
        ))
    }

    #[test]
    fn test_create_typed() {
        let registry = PacketRegistry::with_defaults();
        let packet = registry
            .create(&text_payload("action|join_request\nname|START"))
            .expect("packet");
        assert!(matches!(packet, Packet::JoinRequest(_)));
        assert_eq!(packet.id(), PacketId::JoinRequest);
    }

    #[test]
    fn test_create_falls_back_to_generic() {
        let registry = PacketRegistry::with_defaults();
        let packet = registry
            .create(&text_payload("action|wrench\nnetID|3"))
            .expect("packet");
        assert!(matches!(packet, Packet::GenericText(_)));
        assert_eq!(packet.id(), PacketId::Unknown);
    }

    #[test]
    fn test_empty_registry_uses_generics_for_known_ids() {
        let registry = PacketRegistry::new();
        let packet = registry.create(&text_payload("action|quit")).expect("packet");
        assert!(matches!(packet, Packet::GenericText(_)));
    }

    #[test]
    fn test_typed_rejection_is_none() {
        let registry = PacketRegistry::with_defaults();
        // Claims a compressed blob follows but the frame has none.
        let payload = Payload::Game(GamePayload::new(
            GameUpdatePacket {
                packet_type: PacketType::SendItemDatabaseData as u8,
                int_data: 64,
                ..Default::default()
            },
            Vec::new(),
        ));
        assert!(registry.create(&payload).is_none());
    }

    #[test]
    fn test_replacing_a_factory() {
        let mut registry = PacketRegistry::with_defaults();
        registry.register(PacketId::Quit, |_| None);
        assert!(registry.contains(PacketId::Quit));
        assert!(registry.create(&text_payload("action|quit")).is_none());
    }
}
