//! Keeps the on-disk `items.dat` cache in step with the server.

use gtbridge_event::{Direction, DispatchOutcome, Dispatcher, Event, EventKey};
use gtbridge_items::{proton_file, save_to_file};
use gtbridge_proto::{Packet, PacketId};
use tracing::{error, info, warn};

use crate::bridge::BridgeContext;

pub fn register(dispatcher: &mut Dispatcher<BridgeContext>) {
    dispatcher.append(
        EventKey::Typed(PacketId::SendItemDatabaseData),
        on_item_database,
    );
    dispatcher.append(
        EventKey::Typed(PacketId::OnSuperMainStart),
        on_super_main_start,
    );
}

/// A fresh download replaces the in-memory database and the cache file.
fn on_item_database(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ClientBound) {
        return;
    }
    let Some(Packet::SendItemDatabaseData(packet)) = event.packet() else {
        return;
    };
    if packet.items_dat.is_empty() {
        warn!("No data to parse");
        return;
    }

    if !ctx.items.parse(&packet.items_dat) {
        error!(
            "Failed to parse items.dat (version {}, count {})",
            ctx.items.version(),
            ctx.items.count()
        );
        return;
    }
    info!(
        "Successfully parsed items.dat (version {}, count {})",
        ctx.items.version(),
        ctx.items.count()
    );

    match save_to_file(&ctx.items_path, &packet.items_dat) {
        Ok(()) => info!(
            "Saved items.dat to {} ({} bytes)",
            ctx.items_path.display(),
            packet.items_dat.len()
        ),
        Err(err) => warn!(
            "Failed to save items.dat to {}: {err:#}",
            ctx.items_path.display()
        ),
    }
}

/// The logon bootstrap carries the server's `items.dat` hash; when the
/// cache file matches, it is loaded instead of waiting for a download.
fn on_super_main_start(event: &Event<'_>, ctx: &mut BridgeContext, _outcome: &mut DispatchOutcome) {
    if event.direction() != Some(Direction::ClientBound) {
        return;
    }
    let Some(Packet::OnSuperMainStart(packet)) = event.packet() else {
        return;
    };

    let cached_hash = proton_file(&ctx.items_path);
    if packet.item_hash != cached_hash {
        info!(
            "Hash mismatch: server={}, cached={}",
            packet.item_hash, cached_hash
        );
        return;
    }

    info!("Hash matches, loading cached items.dat (hash: {cached_hash})");
    match ctx.items.load_from_file(&ctx.items_path) {
        Ok(()) => info!(
            "Successfully loaded cached items.dat (version {}, count {})",
            ctx.items.version(),
            ctx.items.count()
        ),
        Err(err) => warn!("Failed to load cached items.dat: {err:#}"),
    }
}
