//! Which packet ids get a dedicated dispatch slot.

use std::collections::HashSet;

use gtbridge_proto::{Packet, PacketId};

use crate::dispatcher::{DispatchOutcome, Dispatcher, Direction, Event, EventKey};

/// Set of packet ids announced on their own [`EventKey::Typed`] slot before
/// the direction-wide pass.
#[derive(Debug, Clone, Default)]
pub struct PacketEventRegistry {
    ids: HashSet<PacketId>,
}

impl PacketEventRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }

    /// Creates a registry covering every id the stock handlers subscribe to.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for id in [
            PacketId::ServerHello,
            PacketId::Quit,
            PacketId::QuitToExit,
            PacketId::JoinRequest,
            PacketId::ValidateWorld,
            PacketId::Input,
            PacketId::Log,
            PacketId::Disconnect,
            PacketId::SendItemDatabaseData,
            PacketId::OnSendToServer,
            PacketId::OnSuperMainStart,
            PacketId::OnSpawn,
            PacketId::OnRemove,
        ] {
            registry.register(id);
        }
        registry
    }

    /// Marks `id` as having its own slot.
    pub fn register(&mut self, id: PacketId) {
        self.ids.insert(id);
    }

    /// Unmarks `id`. Returns whether it was present.
    pub fn unregister(&mut self, id: PacketId) -> bool {
        self.ids.remove(&id)
    }

    /// Whether packets with `id` get a dedicated pass.
    pub fn has_event(&self, id: PacketId) -> bool {
        self.ids.contains(&id)
    }

    /// Announces a decoded packet: the typed slot first when the id is
    /// registered, then the direction-wide slot unless a typed listener
    /// canceled the pass.
    pub fn emit<C>(
        &self,
        dispatcher: &mut Dispatcher<C>,
        direction: Direction,
        packet: &Packet,
        ctx: &mut C,
    ) -> DispatchOutcome {
        let event = Event::Packet { direction, packet };
        if self.has_event(packet.id()) {
            let outcome = dispatcher.dispatch(EventKey::Typed(packet.id()), &event, ctx);
            if outcome.is_canceled() {
                return outcome;
            }
        }
        dispatcher.dispatch(EventKey::packet_stream(direction), &event, ctx)
    }
}
