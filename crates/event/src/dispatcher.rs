//! Listener table with priority ordering and cancellation.

use std::collections::HashMap;
use std::fmt;

use gtbridge_proto::{Packet, PacketId};

/// Listener ordering weight. Lower values run earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i8);

impl Priority {
    /// Runs before everything else registered so far.
    pub const HIGHEST: Self = Self(i8::MIN);
    /// Runs ahead of the default bulk.
    pub const HIGH: Self = Self(i8::MIN / 2);
    /// Default weight.
    pub const NORMAL: Self = Self(0);
    /// Runs behind the default bulk.
    pub const LOW: Self = Self(64);
    /// Runs last. The forwarding listeners sit here.
    pub const LOWEST: Self = Self(i8::MAX);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Which way traffic is travelling through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the real server towards the game client.
    ClientBound,
    /// From the game client towards the real server.
    ServerBound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientBound => write!(f, "client-bound"),
            Self::ServerBound => write!(f, "server-bound"),
        }
    }
}

/// Dispatch slot a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// The game client finished its handshake with the proxy.
    ClientConnect,
    /// The game client went away.
    ClientDisconnect,
    /// The proxy finished its handshake with the real server.
    ServerConnect,
    /// The real server went away.
    ServerDisconnect,
    /// An undecodable frame heading to the game client.
    RawClientBound,
    /// An undecodable frame heading to the real server.
    RawServerBound,
    /// Any decoded packet heading to the game client.
    PacketClientBound,
    /// Any decoded packet heading to the real server.
    PacketServerBound,
    /// A decoded packet with this specific id.
    Typed(PacketId),
}

impl EventKey {
    /// The slot undecodable frames in `direction` are announced on.
    pub fn raw_stream(direction: Direction) -> Self {
        match direction {
            Direction::ClientBound => Self::RawClientBound,
            Direction::ServerBound => Self::RawServerBound,
        }
    }

    /// The direction-wide slot decoded packets in `direction` are announced on.
    pub fn packet_stream(direction: Direction) -> Self {
        match direction {
            Direction::ClientBound => Self::PacketClientBound,
            Direction::ServerBound => Self::PacketServerBound,
        }
    }
}

/// Payload handed to listeners. The key names the occasion; this carries
/// the matching data.
#[derive(Debug)]
pub enum Event<'a> {
    /// A peer arrived or left.
    Connection,
    /// A frame the decoder could not turn into a packet.
    Raw {
        /// Travel direction of the frame.
        direction: Direction,
        /// The frame bytes as read from the wire.
        data: &'a [u8],
    },
    /// A decoded packet.
    Packet {
        /// Travel direction of the packet.
        direction: Direction,
        /// The decoded packet.
        packet: &'a Packet,
    },
}

impl Event<'_> {
    /// Travel direction, when the event carries traffic.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Connection => None,
            Self::Raw { direction, .. } | Self::Packet { direction, .. } => Some(*direction),
        }
    }

    /// The decoded packet, when there is one.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Self::Packet { packet, .. } => Some(packet),
            _ => None,
        }
    }
}

/// What a dispatch pass decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    canceled: bool,
}

impl DispatchOutcome {
    /// Stop the pass and tell the caller to swallow the traffic.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Whether a listener asked for the traffic to be swallowed.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }
}

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<C> = Box<dyn FnMut(&Event<'_>, &mut C, &mut DispatchOutcome)>;

struct Entry<C> {
    id: ListenerId,
    priority: Priority,
    callback: Listener<C>,
}

/// Priority-ordered listener table keyed by [`EventKey`].
///
/// Listeners run lowest priority value first; within a priority they run in
/// registration order. Once a listener cancels the outcome the rest of the
/// pass is skipped. Listeners receive the shared context `C` mutably, so the
/// dispatcher itself never has to live inside it.
pub struct Dispatcher<C> {
    listeners: HashMap<EventKey, Vec<Entry<C>>>,
    next_id: u64,
}

impl<C> Dispatcher<C> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Registers `callback` at [`Priority::NORMAL`].
    pub fn append(
        &mut self,
        key: EventKey,
        callback: impl FnMut(&Event<'_>, &mut C, &mut DispatchOutcome) + 'static,
    ) -> ListenerId {
        self.append_with_priority(key, Priority::NORMAL, callback)
    }

    /// Registers `callback`, slotting it in front of the first listener with
    /// a strictly higher priority value.
    pub fn append_with_priority(
        &mut self,
        key: EventKey,
        priority: Priority,
        callback: impl FnMut(&Event<'_>, &mut C, &mut DispatchOutcome) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let entries = self.listeners.entry(key).or_default();
        let slot = entries
            .iter()
            .position(|entry| entry.priority > priority)
            .unwrap_or(entries.len());
        entries.insert(
            slot,
            Entry {
                id,
                priority,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Registers `callback` ahead of every listener already present.
    pub fn prepend(
        &mut self,
        key: EventKey,
        callback: impl FnMut(&Event<'_>, &mut C, &mut DispatchOutcome) + 'static,
    ) -> ListenerId {
        self.append_with_priority(key, Priority::HIGHEST, callback)
    }

    /// Drops the listener registered under `id`. Returns whether it existed.
    pub fn remove(&mut self, key: EventKey, id: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(&key) else {
            return false;
        };
        let Some(slot) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        entries.remove(slot);
        true
    }

    /// Number of listeners registered under `key`.
    pub fn listener_count(&self, key: EventKey) -> usize {
        self.listeners.get(&key).map_or(0, Vec::len)
    }

    /// Runs the listeners for `key` in order and reports whether one of them
    /// canceled the pass.
    pub fn dispatch(&mut self, key: EventKey, event: &Event<'_>, ctx: &mut C) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let Some(entries) = self.listeners.get_mut(&key) else {
            return outcome;
        };
        for entry in entries.iter_mut() {
            (entry.callback)(event, ctx, &mut outcome);
            if outcome.is_canceled() {
                break;
            }
        }
        outcome
    }
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}
