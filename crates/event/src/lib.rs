#![warn(missing_docs)]
//! Prioritized event dispatch for the proxy pipeline.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{
    DispatchOutcome, Dispatcher, Direction, Event, EventKey, ListenerId, Priority,
};
pub use registry::PacketEventRegistry;
