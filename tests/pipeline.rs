//! Frames written by one peer must come out of the opposite leg after a
//! full decode, dispatch, and re-encode pass, with listeners able to
//! rewrite or swallow traffic on the way through.

use std::net::SocketAddr;
use std::time::Duration;

use gtbridge_event::{
    Direction, DispatchOutcome, Dispatcher, Event, EventKey, PacketEventRegistry, Priority,
};
use gtbridge_net::{Endpoint, TransportEvent};
use gtbridge_proto::packets::{OnSendToServer, Quit};
use gtbridge_proto::{Packet, PacketDecoder, PacketId};

/// The two proxy legs plus what the redirect listener captured.
struct Legs {
    /// Towards the real server.
    client: Endpoint,
    /// Towards the game client.
    server: Endpoint,
    proxy_port: u16,
    captured: Option<(String, u16)>,
}

fn localhost(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn pump(endpoint: &mut Endpoint) -> Vec<TransportEvent> {
    endpoint.process().expect("Failed to pump endpoint")
}

fn connect_pair(listener: &mut Endpoint, dialer: &mut Endpoint) {
    dialer
        .dial(localhost(listener.local_addr().port()))
        .expect("Failed to start connect");
    let mut listener_up = false;
    let mut dialer_up = false;
    for _ in 0..400 {
        listener_up |= pump(listener).contains(&TransportEvent::Connected);
        dialer_up |= pump(dialer).contains(&TransportEvent::Connected);
        if listener_up && dialer_up {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("handshake did not complete");
}

/// The bridge's frame path: decode, emit typed-then-stream, fall back to
/// the raw slot for frames the decoder cannot claim.
fn relay(
    decoder: &PacketDecoder,
    registry: &PacketEventRegistry,
    dispatcher: &mut Dispatcher<Legs>,
    direction: Direction,
    data: &[u8],
    legs: &mut Legs,
) {
    match decoder.decode(data, "test") {
        Some(packet) => {
            registry.emit(dispatcher, direction, &packet, legs);
        }
        None => {
            dispatcher.dispatch(
                EventKey::raw_stream(direction),
                &Event::Raw { direction, data },
                legs,
            );
        }
    }
}

fn register_forwarding(dispatcher: &mut Dispatcher<Legs>) {
    for direction in [Direction::ClientBound, Direction::ServerBound] {
        dispatcher.append_with_priority(
            EventKey::raw_stream(direction),
            Priority::LOWEST,
            |event: &Event<'_>, legs: &mut Legs, _: &mut DispatchOutcome| {
                let Event::Raw { direction, data } = event else {
                    return;
                };
                match direction {
                    Direction::ClientBound => legs.server.write(data),
                    Direction::ServerBound => legs.client.write(data),
                };
            },
        );
        dispatcher.append_with_priority(
            EventKey::packet_stream(direction),
            Priority::LOWEST,
            |event: &Event<'_>, legs: &mut Legs, _: &mut DispatchOutcome| {
                let Event::Packet { direction, packet } = event else {
                    return;
                };
                let data = packet.encode();
                match direction {
                    Direction::ClientBound => legs.server.write(&data),
                    Direction::ServerBound => legs.client.write(&data),
                };
            },
        );
    }
}

/// Everything a pipeline test needs: a connected game client, a connected
/// upstream server, and the bridge legs between them.
struct Harness {
    game_client: Endpoint,
    upstream: Endpoint,
    legs: Legs,
    dispatcher: Dispatcher<Legs>,
    decoder: PacketDecoder,
    registry: PacketEventRegistry,
}

impl Harness {
    fn new() -> Self {
        let mut bridge_server = Endpoint::listen(0).expect("Failed to bind bridge server");
        let mut game_client = Endpoint::dialer().expect("Failed to create game client");
        connect_pair(&mut bridge_server, &mut game_client);

        let mut upstream = Endpoint::listen(0).expect("Failed to bind upstream");
        let mut bridge_client = Endpoint::dialer().expect("Failed to create bridge client");
        connect_pair(&mut upstream, &mut bridge_client);

        let proxy_port = bridge_server.local_addr().port();
        let mut dispatcher = Dispatcher::new();
        register_forwarding(&mut dispatcher);

        Self {
            game_client,
            upstream,
            legs: Legs {
                client: bridge_client,
                server: bridge_server,
                proxy_port,
                captured: None,
            },
            dispatcher,
            decoder: PacketDecoder::with_defaults(),
            registry: PacketEventRegistry::with_defaults(),
        }
    }

    /// Runs bridge ticks until `done` sees what it was waiting for in the
    /// frames arriving at the outer peers.
    fn pump_until(&mut self, mut done: impl FnMut(Option<&[u8]>, Option<&[u8]>) -> bool) -> bool {
        for _ in 0..400 {
            let server_events = pump(&mut self.legs.server);
            for event in server_events {
                if let TransportEvent::Frame(data) = event {
                    relay(
                        &self.decoder,
                        &self.registry,
                        &mut self.dispatcher,
                        Direction::ServerBound,
                        &data,
                        &mut self.legs,
                    );
                }
            }
            let client_events = pump(&mut self.legs.client);
            for event in client_events {
                if let TransportEvent::Frame(data) = event {
                    relay(
                        &self.decoder,
                        &self.registry,
                        &mut self.dispatcher,
                        Direction::ClientBound,
                        &data,
                        &mut self.legs,
                    );
                }
            }
            self.legs.server.flush();
            self.legs.client.flush();

            let mut at_game_client = None;
            for event in pump(&mut self.game_client) {
                if let TransportEvent::Frame(data) = event {
                    at_game_client = Some(data);
                }
            }
            let mut at_upstream = None;
            for event in pump(&mut self.upstream) {
                if let TransportEvent::Frame(data) = event {
                    at_upstream = Some(data);
                }
            }

            if done(at_game_client.as_deref(), at_upstream.as_deref()) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

#[test]
fn test_decoded_frames_cross_the_bridge_intact() {
    let mut harness = Harness::new();

    let frame = Packet::Quit(Quit).encode();
    assert!(harness.game_client.write(&frame));
    harness.game_client.flush();

    let mut forwarded = None;
    let done = harness.pump_until(|_, at_upstream| {
        if let Some(data) = at_upstream {
            forwarded = Some(data.to_vec());
        }
        forwarded.is_some()
    });
    assert!(done, "frame never reached the upstream peer");
    assert_eq!(forwarded.expect("frame missing"), frame);
}

#[test]
fn test_undecodable_frames_pass_through_verbatim() {
    let mut harness = Harness::new();

    // Message kind 7 is on the wire but never interpreted here.
    let mut frame = 7u32.to_le_bytes().to_vec();
    frame.extend_from_slice(b"client log request");
    assert!(harness.game_client.write(&frame));
    harness.game_client.flush();

    let mut forwarded = None;
    let done = harness.pump_until(|_, at_upstream| {
        if let Some(data) = at_upstream {
            forwarded = Some(data.to_vec());
        }
        forwarded.is_some()
    });
    assert!(done, "frame never reached the upstream peer");
    assert_eq!(forwarded.expect("frame missing"), frame);
}

#[test]
fn test_server_switch_is_rewritten_for_the_game_client() {
    let mut harness = Harness::new();

    harness.dispatcher.append(
        EventKey::Typed(PacketId::OnSendToServer),
        |event: &Event<'_>, legs: &mut Legs, outcome: &mut DispatchOutcome| {
            let Some(Packet::OnSendToServer(packet)) = event.packet() else {
                return;
            };
            legs.captured = Some((packet.address.clone(), packet.port));
            let mut rewritten = packet.clone();
            rewritten.address = "127.0.0.1".to_string();
            rewritten.port = legs.proxy_port;
            legs.server.write(&rewritten.write().encode());
            outcome.cancel();
        },
    );

    let switch = OnSendToServer {
        port: 17091,
        token: 1337,
        user: 42,
        address: "213.179.209.168".to_string(),
        door_id: "door".to_string(),
        uuid_token: "uuid".to_string(),
        login_mode: 1,
        username: "gt".to_string(),
    };
    assert!(harness
        .upstream
        .write(&Packet::OnSendToServer(switch.clone()).encode()));
    harness.upstream.flush();

    let mut delivered = None;
    let done = harness.pump_until(|at_game_client, at_upstream| {
        assert!(at_upstream.is_none(), "swallowed frame must not bounce back");
        if let Some(data) = at_game_client {
            delivered = Some(data.to_vec());
        }
        delivered.is_some()
    });
    assert!(done, "rewritten frame never reached the game client");

    let decoder = PacketDecoder::with_defaults();
    let Some(Packet::OnSendToServer(rewritten)) =
        decoder.decode(&delivered.expect("frame missing"), "test")
    else {
        panic!("game client should receive a server switch");
    };
    assert_eq!(rewritten.address, "127.0.0.1");
    assert_eq!(rewritten.port, harness.legs.proxy_port);
    assert_eq!(rewritten.door_id, switch.door_id);
    assert_eq!(rewritten.username, switch.username);

    assert_eq!(
        harness.legs.captured,
        Some(("213.179.209.168".to_string(), 17091))
    );
}
