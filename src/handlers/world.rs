//! Maintains the player table across world joins.

use gtbridge_event::{Direction, DispatchOutcome, Dispatcher, Event, EventKey};
use gtbridge_proto::{Packet, PacketId};
use tracing::debug;

use crate::bridge::BridgeContext;
use crate::session::Player;

pub fn register(dispatcher: &mut Dispatcher<BridgeContext>) {
    dispatcher.append(EventKey::Typed(PacketId::JoinRequest), on_join_request);
    dispatcher.append(EventKey::Typed(PacketId::OnSpawn), on_spawn);
    dispatcher.append(EventKey::Typed(PacketId::OnRemove), on_remove);
}

fn on_join_request(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ServerBound) {
        return;
    }
    ctx.session.clear_players();
    debug!("Cleared the player table for the next world");
}

fn on_spawn(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ClientBound) {
        return;
    }
    let Some(Packet::OnSpawn(packet)) = event.packet() else {
        return;
    };
    let player = Player::from_spawn(packet);
    debug!(
        "Avatar \"{}\" spawned with net id {}{}",
        player.name,
        player.net_id,
        if player.is_local { " (local)" } else { "" }
    );
    ctx.session.add_player(player);
}

fn on_remove(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ClientBound) {
        return;
    }
    let Some(Packet::OnRemove(packet)) = event.packet() else {
        return;
    };
    if let Some(player) = ctx.session.remove_player(packet.net_id) {
        debug!(
            "Avatar \"{}\" despawned from net id {}",
            player.name, packet.net_id
        );
    }
}
