//! The proxy core: one tick loop pumping both ENet legs through the
//! decoder and the dispatcher.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use gtbridge_event::{Direction, Dispatcher, Event, EventKey, PacketEventRegistry};
use gtbridge_items::ItemDatabase;
use gtbridge_net::{Endpoint, TransportEvent};
use gtbridge_proto::{PacketDecoder, PacketRegistry};
use gtbridge_web::RedirectTarget;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::handlers;
use crate::scheduler::{Scheduler, TaskOptions};
use crate::session::SessionState;

const TICK_INTERVAL: Duration = Duration::from_micros(5000);
const STATUS_INTERVAL: Duration = Duration::from_secs(30);
const STATUS_TAG: &str = "bridge";

/// Everything the dispatched listeners may touch.
///
/// Leg naming follows the proxy's point of view: `server` is the ENet host
/// the game client connects to, `client` is the connection this proxy
/// holds towards the real server.
pub struct BridgeContext {
    /// Outbound leg towards the real server.
    pub client: Endpoint,
    /// Inbound leg the game client attaches to.
    pub server: Endpoint,
    /// Player table and the captured redirect target.
    pub session: SessionState,
    /// Parsed `items.dat`, kept warm across reconnects.
    pub items: ItemDatabase,
    /// ENet port rewritten into intercepted server switches.
    pub proxy_port: u16,
    /// Where the raw `items.dat` download is cached.
    pub items_path: PathBuf,
}

/// Which leg a transport event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Client,
    Server,
}

/// Owns the dispatch pipeline and both endpoints, and drives them from a
/// fixed-cadence tokio loop.
pub struct Bridge {
    dispatcher: Dispatcher<BridgeContext>,
    registry: PacketEventRegistry,
    decoder: PacketDecoder,
    ctx: BridgeContext,
    scheduler: Scheduler,
    redirect_rx: mpsc::UnboundedReceiver<RedirectTarget>,
    status_rx: mpsc::UnboundedReceiver<()>,
}

impl Bridge {
    /// Binds both legs and wires up the stock handlers. Must be called
    /// from inside a tokio runtime; `redirect_rx` carries server addresses
    /// captured by the web bootstrap.
    pub fn new(
        config: &Config,
        redirect_rx: mpsc::UnboundedReceiver<RedirectTarget>,
    ) -> Result<Self> {
        let server = Endpoint::listen(config.host.port).context("Failed to bind the proxy server")?;
        let client = Endpoint::dialer().context("Failed to set up the proxy client")?;
        let proxy_port = server.local_addr().port();

        let ctx = BridgeContext {
            client,
            server,
            session: SessionState::new(),
            items: ItemDatabase::new(),
            proxy_port,
            items_path: config.cache.items.clone(),
        };

        let mut dispatcher = Dispatcher::new();
        handlers::register_all(&mut dispatcher);

        let decoder = PacketDecoder::new(PacketRegistry::with_defaults(), config.log.decode_log());

        let scheduler = Scheduler::new();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        scheduler.schedule(
            move || {
                let _ = status_tx.send(());
            },
            TaskOptions {
                delay: STATUS_INTERVAL,
                interval: Some(STATUS_INTERVAL),
                tag: Some(STATUS_TAG.to_string()),
                ..Default::default()
            },
        );

        info!("Bridge initialized successfully");
        Ok(Self {
            dispatcher,
            registry: PacketEventRegistry::with_defaults(),
            decoder,
            ctx,
            scheduler,
            redirect_rx,
            status_rx,
        })
    }

    /// Runs the tick loop until the task is dropped or a leg fails hard.
    pub async fn run(&mut self) -> Result<()> {
        let mut ticker = time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick()?;
        }
    }

    /// One pass: drain the side channels, pump both legs, flush.
    fn tick(&mut self) -> Result<()> {
        while let Ok(target) = self.redirect_rx.try_recv() {
            debug!(
                "Captured server address {}:{} from the web bootstrap",
                target.address, target.port
            );
            self.ctx.session.set_redirect(target);
        }
        while self.status_rx.try_recv().is_ok() {
            self.log_status();
        }

        let server_events = self
            .ctx
            .server
            .process()
            .context("Failed to pump the proxy server")?;
        for event in server_events {
            self.handle_transport(Leg::Server, event);
        }

        let client_events = self
            .ctx
            .client
            .process()
            .context("Failed to pump the proxy client")?;
        for event in client_events {
            self.handle_transport(Leg::Client, event);
        }

        self.ctx.server.flush();
        self.ctx.client.flush();
        Ok(())
    }

    fn handle_transport(&mut self, leg: Leg, event: TransportEvent) {
        match (leg, event) {
            (Leg::Server, TransportEvent::Connected) => {
                info!("Game client connected to the proxy");
                self.dispatcher
                    .dispatch(EventKey::ClientConnect, &Event::Connection, &mut self.ctx);
            }
            (Leg::Server, TransportEvent::Disconnected) => {
                info!("Game client disconnected from the proxy");
                self.dispatcher.dispatch(
                    EventKey::ClientDisconnect,
                    &Event::Connection,
                    &mut self.ctx,
                );
            }
            (Leg::Server, TransportEvent::Frame(data)) => {
                self.handle_frame(Direction::ServerBound, &data);
            }
            (Leg::Client, TransportEvent::Connected) => {
                info!("Proxy connected to the Growtopia server");
                self.dispatcher
                    .dispatch(EventKey::ServerConnect, &Event::Connection, &mut self.ctx);
            }
            (Leg::Client, TransportEvent::Disconnected) => {
                info!("Growtopia server dropped the proxy connection");
                self.dispatcher.dispatch(
                    EventKey::ServerDisconnect,
                    &Event::Connection,
                    &mut self.ctx,
                );
            }
            (Leg::Client, TransportEvent::Frame(data)) => {
                self.handle_frame(Direction::ClientBound, &data);
            }
        }
    }

    /// Decoded frames go through the typed-then-stream pass; everything
    /// else is announced raw so the forwarding listener can relay it.
    fn handle_frame(&mut self, direction: Direction, data: &[u8]) {
        let label = direction_label(direction);
        match self.decoder.decode(data, label) {
            Some(packet) => {
                let outcome =
                    self.registry
                        .emit(&mut self.dispatcher, direction, &packet, &mut self.ctx);
                if outcome.is_canceled() {
                    trace!("[{label}] {:?} was swallowed by a listener", packet.id());
                }
            }
            None => {
                self.dispatcher.dispatch(
                    EventKey::raw_stream(direction),
                    &Event::Raw { direction, data },
                    &mut self.ctx,
                );
            }
        }
    }

    fn log_status(&self) {
        info!(
            "Session status: game client {}, server link {}, {} players, {} scheduled tasks",
            link_label(self.ctx.server.is_connected()),
            link_label(self.ctx.client.is_connected()),
            self.ctx.session.player_count(),
            self.scheduler.pending_count(),
        );
    }

    /// Port the ENet listener actually bound, for the bootstrap rewrite.
    pub fn enet_port(&self) -> u16 {
        self.ctx.proxy_port
    }

    /// Drops both peers and stops the periodic work. Run after the tick
    /// loop has been torn down.
    pub fn shutdown(&mut self) {
        let canceled = self.scheduler.cancel_by_tag(STATUS_TAG) + self.scheduler.cancel_all();
        debug!("Canceled {canceled} scheduled tasks");
        self.ctx.server.disconnect_now();
        self.ctx.client.disconnect_now();
        self.ctx.server.flush();
        self.ctx.client.flush();
        info!("Bridge shut down");
    }
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::ClientBound => "client-bound",
        Direction::ServerBound => "server-bound",
    }
}

fn link_label(connected: bool) -> &'static str {
    if connected {
        "up"
    } else {
        "down"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtbridge_proto::packets::{JoinRequest, OnSendToServer};
    use gtbridge_proto::Packet;

    use crate::session::Player;

    fn test_config() -> Config {
        let mut config = Config::default();
        // Ephemeral port, the rewrite picks up whatever the bind produced.
        config.host.port = 0;
        config
    }

    fn test_bridge() -> Bridge {
        let (_tx, rx) = mpsc::unbounded_channel();
        Bridge::new(&test_config(), rx).expect("Failed to build bridge")
    }

    #[tokio::test]
    async fn test_bridge_wires_the_stock_handlers() {
        let bridge = test_bridge();
        assert!(bridge.dispatcher.listener_count(EventKey::ClientConnect) > 0);
        assert!(bridge.dispatcher.listener_count(EventKey::RawClientBound) > 0);
        assert!(bridge.dispatcher.listener_count(EventKey::PacketServerBound) > 0);
        assert!(bridge.ctx.proxy_port != 0);
        // The periodic status task is queued from the start.
        assert_eq!(bridge.scheduler.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_server_switch_is_captured_and_swallowed() {
        let mut bridge = test_bridge();
        let frame = Packet::OnSendToServer(OnSendToServer {
            port: 17091,
            token: 1337,
            user: 42,
            address: "213.179.209.168".to_string(),
            door_id: "door".to_string(),
            uuid_token: "uuid".to_string(),
            login_mode: 1,
            username: "gt".to_string(),
        })
        .encode();

        bridge.handle_frame(Direction::ClientBound, &frame);

        let target = bridge
            .ctx
            .session
            .take_redirect()
            .expect("redirect should be captured");
        assert_eq!(target.address, "213.179.209.168");
        assert_eq!(target.port, 17091);
    }

    #[tokio::test]
    async fn test_join_request_clears_the_player_table() {
        let mut bridge = test_bridge();
        bridge.ctx.session.add_player(Player {
            net_id: 3,
            user_id: 300,
            name: "left behind".to_string(),
            country_code: "us".to_string(),
            position: glam::IVec2::ZERO,
            collision: glam::IVec4::ZERO,
            invisible: 0,
            mod_state: 0,
            supermod_state: 0,
            is_local: false,
        });

        let frame = Packet::JoinRequest(JoinRequest {
            world_name: "START".to_string(),
            invited_world: false,
        })
        .encode();
        bridge.handle_frame(Direction::ServerBound, &frame);

        assert_eq!(bridge.ctx.session.player_count(), 0);
    }

    #[tokio::test]
    async fn test_web_channel_feeds_the_redirect_slot() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut bridge = Bridge::new(&test_config(), rx).expect("Failed to build bridge");

        tx.send(RedirectTarget {
            address: "213.179.209.168".to_string(),
            port: 17091,
        })
        .expect("bridge dropped the receiver");
        bridge.tick().expect("tick failed");

        let target = bridge
            .ctx
            .session
            .take_redirect()
            .expect("redirect should be captured");
        assert_eq!(target.port, 17091);
    }

    #[tokio::test]
    async fn test_direction_checks_do_not_cross() {
        let mut bridge = test_bridge();
        // A client-bound join request must not touch the table.
        bridge.ctx.session.add_player(Player {
            net_id: 9,
            user_id: 900,
            name: "stays".to_string(),
            country_code: "us".to_string(),
            position: glam::IVec2::ZERO,
            collision: glam::IVec4::ZERO,
            invisible: 0,
            mod_state: 0,
            supermod_state: 0,
            is_local: false,
        });

        let frame = Packet::JoinRequest(JoinRequest {
            world_name: "START".to_string(),
            invited_world: false,
        })
        .encode();
        bridge.handle_frame(Direction::ClientBound, &frame);

        assert_eq!(bridge.ctx.session.player_count(), 1);
    }
}
