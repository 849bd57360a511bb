//! Single-peer ENet hosts polled from the bridge loop.
//!
//! Both proxy legs use the same endpoint type: one listens for the game
//! client, the other dials the real server. All calls into `rusty_enet`
//! stay inside this module.

use std::net::{SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use rusty_enet as enet;
use tracing::{debug, info, warn};

const CHANNEL_LIMIT: usize = 2;
const DATA_CHANNEL: u8 = 0;
/// Anything shorter than the message-kind prefix is junk.
const MIN_FRAME_LEN: usize = 4;
/// Ceiling for frames accepted from the game client.
const MAX_LISTENER_FRAME_LEN: usize = 16384;

/// What one [`Endpoint::process`] pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The remote peer completed its handshake.
    Connected,
    /// The remote peer left or timed out.
    Disconnected,
    /// A whole frame arrived on the data channel.
    Frame(Vec<u8>),
}

/// Owned step extracted from a service pass, so the host borrow is released
/// before the endpoint reacts to it.
enum PumpStep {
    Connect(enet::PeerID),
    Disconnect,
    Frame(Vec<u8>),
}

/// One leg of the proxy: an ENet host limited to a single peer.
pub struct Endpoint {
    host: enet::Host<UdpSocket>,
    local_addr: SocketAddr,
    peer: Option<enet::PeerID>,
    connected: bool,
    max_frame_len: Option<usize>,
}

impl Endpoint {
    /// Binds the leg the game client connects to.
    pub fn listen(port: u16) -> Result<Self> {
        let endpoint = Self::bind(
            SocketAddr::from(([0, 0, 0, 0], port)),
            Some(MAX_LISTENER_FRAME_LEN),
        )?;
        info!(
            "Proxy server listening on port {} (max 1 peer)",
            endpoint.local_addr.port()
        );
        Ok(endpoint)
    }

    /// Binds the leg that dials the real server.
    pub fn dialer() -> Result<Self> {
        let endpoint = Self::bind(SocketAddr::from(([0, 0, 0, 0], 0)), None)?;
        info!("Proxy client ready to connect");
        Ok(endpoint)
    }

    fn bind(addr: SocketAddr, max_frame_len: Option<usize>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .with_context(|| format!("Failed to bind UDP socket on {addr}"))?;
        let local_addr = socket
            .local_addr()
            .context("Failed to read bound socket address")?;
        let host = enet::Host::new(
            socket,
            enet::HostSettings {
                peer_limit: 1,
                channel_limit: CHANNEL_LIMIT,
                compressor: Some(Box::new(enet::RangeCoder::new())),
                checksum: Some(Box::new(enet::crc32)),
                ..Default::default()
            },
        )
        .context("Failed to create ENet host")?;
        Ok(Self {
            host,
            local_addr,
            peer: None,
            connected: false,
            max_frame_len,
        })
    }

    /// Address the underlying socket ended up bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts an ENet connect to `address`. The handshake completes
    /// asynchronously; [`TransportEvent::Connected`] reports success.
    pub fn dial(&mut self, address: SocketAddr) -> Result<()> {
        debug!("Connecting to {address}");
        let peer = self
            .host
            .connect(address, CHANNEL_LIMIT, 0)
            .with_context(|| format!("Failed to start ENet connect to {address}"))?;
        self.peer = Some(peer.id());
        Ok(())
    }

    /// Drains pending ENet events into transport events.
    ///
    /// Frames below the minimum length, or above the leg's ceiling when it
    /// has one, disconnect the peer instead of surfacing.
    pub fn process(&mut self) -> Result<Vec<TransportEvent>> {
        let mut events = Vec::new();
        loop {
            let step = match self
                .host
                .service()
                .context("ENet host service failed")?
            {
                None => break,
                Some(enet::Event::Connect { peer, .. }) => PumpStep::Connect(peer.id()),
                Some(enet::Event::Disconnect { .. }) => PumpStep::Disconnect,
                Some(enet::Event::Receive { packet, .. }) => {
                    PumpStep::Frame(packet.data().to_vec())
                }
            };
            match step {
                PumpStep::Connect(id) => {
                    self.peer = Some(id);
                    self.connected = true;
                    events.push(TransportEvent::Connected);
                }
                PumpStep::Disconnect => {
                    if self.peer.take().is_some() {
                        self.connected = false;
                        events.push(TransportEvent::Disconnected);
                    }
                }
                PumpStep::Frame(data) => {
                    if data.len() < MIN_FRAME_LEN
                        || self.max_frame_len.is_some_and(|max| data.len() > max)
                    {
                        warn!("Received malformed frame (size {})", data.len());
                        self.disconnect();
                        continue;
                    }
                    events.push(TransportEvent::Frame(data));
                }
            }
        }
        Ok(events)
    }

    /// Queues `data` as a reliable packet on the data channel. Returns
    /// whether the peer accepted it.
    pub fn write(&mut self, data: &[u8]) -> bool {
        if !self.connected {
            return false;
        }
        let Some(id) = self.peer else {
            return false;
        };
        self.host
            .peer_mut(id)
            .send(DATA_CHANNEL, &enet::Packet::reliable(data))
            .is_ok()
    }

    /// Asks the peer to leave once queued traffic settles. The matching
    /// [`TransportEvent::Disconnected`] arrives through [`Self::process`].
    pub fn disconnect(&mut self) {
        if let Some(id) = self.peer {
            self.host.peer_mut(id).disconnect(0);
        }
    }

    /// Drops the peer without a handshake. No transport event follows.
    pub fn disconnect_now(&mut self) {
        if let Some(id) = self.peer.take() {
            self.host.peer_mut(id).disconnect_now(0);
            self.connected = false;
        }
    }

    /// Whether the peer handshake has completed and not yet torn down.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Pushes queued outgoing packets onto the wire.
    pub fn flush(&mut self) {
        self.host.flush();
    }
}
