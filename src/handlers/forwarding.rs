//! Relays traffic to the opposite leg once every other listener had its say.

use gtbridge_event::{Direction, DispatchOutcome, Dispatcher, Event, EventKey, Priority};
use tracing::debug;

use crate::bridge::BridgeContext;

pub fn register(dispatcher: &mut Dispatcher<BridgeContext>) {
    for direction in [Direction::ClientBound, Direction::ServerBound] {
        dispatcher.append_with_priority(
            EventKey::raw_stream(direction),
            Priority::LOWEST,
            forward_raw,
        );
        dispatcher.append_with_priority(
            EventKey::packet_stream(direction),
            Priority::LOWEST,
            forward_packet,
        );
    }
}

/// Frames the decoder could not claim pass through byte for byte.
fn forward_raw(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    let Event::Raw { direction, data } = event else {
        return;
    };
    if !write_towards(*direction, ctx, data) {
        debug!(
            "Dropped undecoded {direction} frame of {} bytes, peer not connected",
            data.len()
        );
    }
}

/// Decoded packets are re-encoded, so listener edits reach the wire.
fn forward_packet(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    let Event::Packet { direction, packet } = event else {
        return;
    };
    if !write_towards(*direction, ctx, &packet.encode()) {
        debug!(
            "Dropped {direction} {:?} packet, peer not connected",
            packet.id()
        );
    }
}

fn write_towards(direction: Direction, ctx: &mut BridgeContext, data: &[u8]) -> bool {
    match direction {
        Direction::ClientBound => ctx.server.write(data),
        Direction::ServerBound => ctx.client.write(data),
    }
}
