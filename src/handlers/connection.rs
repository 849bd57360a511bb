//! Connection lifecycle: bridging the game client to the real server and
//! tearing both legs down in the right order.

use std::net::{SocketAddr, ToSocketAddrs};

use gtbridge_event::{Direction, DispatchOutcome, Dispatcher, Event, EventKey};
use gtbridge_proto::{Packet, PacketId};
use gtbridge_web::RedirectTarget;
use tracing::{error, info, warn};

use crate::bridge::BridgeContext;

pub fn register(dispatcher: &mut Dispatcher<BridgeContext>) {
    dispatcher.append(EventKey::ClientConnect, on_client_connect);
    dispatcher.append(EventKey::ClientDisconnect, on_client_disconnect);
    dispatcher.append(EventKey::ServerDisconnect, on_server_disconnect);
    dispatcher.append(EventKey::Typed(PacketId::Quit), on_quit);
    dispatcher.append(EventKey::Typed(PacketId::Disconnect), on_disconnect_packet);
    dispatcher.append(EventKey::Typed(PacketId::OnSendToServer), on_send_to_server);
}

/// The game client finished its handshake: consume the captured server
/// address and dial the real host.
fn on_client_connect(_event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    let Some(target) = ctx.session.take_redirect() else {
        warn!("Game client connected without a captured server address");
        return;
    };
    info!(
        "Connecting to Growtopia server at {}:{}",
        target.address, target.port
    );
    let Some(address) = resolve_target(&target) else {
        return;
    };
    if let Err(err) = ctx.client.dial(address) {
        error!("Failed to start connect to {address}: {err:#}");
    }
}

/// Captured targets are IP literals in practice, so this stays off the
/// network; a hostname goes through system resolution.
fn resolve_target(target: &RedirectTarget) -> Option<SocketAddr> {
    match (target.address.as_str(), target.port).to_socket_addrs() {
        Ok(mut addrs) => addrs.next(),
        Err(err) => {
            error!("Failed to resolve server address {}: {err}", target.address);
            None
        }
    }
}

fn on_client_disconnect(
    _event: &Event<'_>,
    ctx: &mut BridgeContext,
    _outcome: &mut DispatchOutcome,
) {
    ctx.session.clear_redirect();
    if ctx.client.is_connected() {
        ctx.client.disconnect();
        info!("Gracefully disconnect Growtopia server from proxy client");
    }
}

fn on_server_disconnect(
    _event: &Event<'_>,
    ctx: &mut BridgeContext,
    _outcome: &mut DispatchOutcome,
) {
    if ctx.server.is_connected() {
        ctx.server.disconnect();
        info!("Gracefully disconnect Growtopia client from proxy server");
    }
}

/// The client is leaving on its own terms: let its leg drain, yank the
/// upstream side.
fn on_quit(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ServerBound) {
        return;
    }
    ctx.server.disconnect();
    ctx.client.disconnect_now();
    info!("Forced disconnect proxy client from Growtopia server");
}

/// A client-issued disconnect packet tears both legs down immediately.
fn on_disconnect_packet(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ServerBound) {
        return;
    }
    ctx.server.disconnect_now();
    info!("Forced disconnect proxy server from Growtopia client");
    ctx.client.disconnect_now();
    info!("Forced disconnect proxy client from Growtopia server");
}

/// The server is moving the client to a world host: capture the real
/// coordinates, hand the client a copy pointing back at this proxy, and
/// swallow the original.
fn on_send_to_server(event: &Event<'_>, ctx: &mut BridgeContext, outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ClientBound) {
        return;
    }
    let Some(Packet::OnSendToServer(packet)) = event.packet() else {
        return;
    };

    info!(
        "Intercepted server switch to {}:{}",
        packet.address, packet.port
    );
    ctx.session.set_redirect(RedirectTarget {
        address: packet.address.clone(),
        port: packet.port,
    });

    let mut rewritten = packet.clone();
    rewritten.address = "127.0.0.1".to_string();
    rewritten.port = ctx.proxy_port;
    if !ctx.server.write(&rewritten.write().encode()) {
        warn!("Failed to deliver the rewritten server switch to the game client");
    }
    outcome.cancel();
}
