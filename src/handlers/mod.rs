//! Stock listeners wired into the bridge dispatcher.
//!
//! Every handler is a plain function taking the event, the bridge context,
//! and the pass outcome; registration order within a priority decides ties.
//! The forwarding pair sits at the lowest priority so anything registered
//! at the defaults can rewrite or swallow traffic first.

pub mod connection;
pub mod forwarding;
pub mod items;
pub mod world;

use gtbridge_event::Dispatcher;

use crate::bridge::BridgeContext;

/// Registers the full stock set.
pub fn register_all(dispatcher: &mut Dispatcher<BridgeContext>) {
    connection::register(dispatcher);
    items::register(dispatcher);
    world::register(dispatcher);
    forwarding::register(dispatcher);
}
