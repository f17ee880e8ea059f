//! Integration tests for the reliable and best-effort channels.
//!
//! These open real loopback sockets. `host()` blocks, so the hosting side
//! runs on a helper thread while the test thread connects. Each test uses
//! its own port so they can run in parallel.

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use duelsync_protocol::{
    EntityState, Event, EventBody, Identity, Message, Snapshot, Vec2,
};
use duelsync_transport::{
    BestEffortChannel, Channel, ReliableChannel, TransportError,
};

// =========================================================================
// Helpers
// =========================================================================

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Connects, retrying while the hosting thread is still binding.
fn connect_with_retry<C: Channel>(channel: &mut C) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match channel.connect() {
            Ok(()) => return,
            Err(_) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => panic!("connect never succeeded: {e}"),
        }
    }
}

/// Polls `receive()` until it yields something or the deadline passes.
fn receive_some<C: Channel, T: serde::de::DeserializeOwned>(
    channel: &mut C,
) -> Vec<T> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let got: Vec<T> = channel.receive().expect("receive should succeed");
        if !got.is_empty() || Instant::now() > deadline {
            return got;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Hosts a reliable channel on a helper thread and connects to it.
fn reliable_pair(port: u16) -> (ReliableChannel, ReliableChannel) {
    let hosting = thread::spawn(move || {
        let mut server = ReliableChannel::new(addr(port));
        server.host().expect("host should accept");
        server
    });
    let mut client = ReliableChannel::new(addr(port));
    connect_with_retry(&mut client);
    let server = hosting.join().expect("host thread should finish");
    (server, client)
}

/// Binds the best-effort host first so the probe can't be lost, then
/// completes the pairing.
fn best_effort_pair(port: u16) -> (BestEffortChannel, BestEffortChannel) {
    let mut server = BestEffortChannel::new(addr(port));
    server.bind().expect("bind should succeed");
    let hosting = thread::spawn(move || {
        server.host().expect("host should see the probe");
        server
    });
    let mut client = BestEffortChannel::new(addr(port));
    client.connect().expect("connect should succeed");
    let server = hosting.join().expect("host thread should finish");
    (server, client)
}

fn snapshot(x: f32) -> Message {
    Message::Snapshot(Snapshot {
        player: EntityState {
            position: Vec2::new(x, 10.0),
            velocity: Vec2::new(1.0, -1.0),
            radius: 20.0,
        },
        objective: EntityState::default(),
    })
}

fn eat(damage: u32) -> Message {
    Message::Event(Event {
        sender: Identity::CLIENT,
        receiver: Identity::HOST,
        body: EventBody::EatPerson { damage },
    })
}

// =========================================================================
// Reliable channel
// =========================================================================

#[test]
fn test_reliable_host_connect_send_receive() {
    let (mut server, mut client) = reliable_pair(19801);
    assert!(server.ready());
    assert!(client.ready());

    // Nothing has been sent: these must return immediately and empty.
    assert!(server.receive::<String>().unwrap().is_empty());
    assert!(client.receive::<String>().unwrap().is_empty());

    client.send(&"Hello world!".to_string()).unwrap();
    let got: Vec<String> = receive_some(&mut server);
    assert_eq!(got, vec!["Hello world!".to_string()]);

    server.send(&"Goodbye world!".to_string()).unwrap();
    let got: Vec<String> = receive_some(&mut client);
    assert_eq!(got, vec!["Goodbye world!".to_string()]);

    client.close().unwrap();
    server.close().unwrap();
    assert!(!client.ready());
    assert!(!server.ready());
}

#[test]
fn test_reliable_preserves_send_order() {
    let (mut server, mut client) = reliable_pair(19802);

    for damage in 0..200 {
        client.send(&eat(damage)).unwrap();
    }

    let mut got: Vec<Message> = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while got.len() < 200 && Instant::now() < deadline {
        got.extend(server.receive::<Message>().unwrap());
        thread::sleep(Duration::from_millis(2));
    }

    let expected: Vec<Message> = (0..200).map(eat).collect();
    assert_eq!(got, expected, "every event exactly once, in order");
}

#[test]
fn test_reliable_delivers_pending_data_before_reporting_close() {
    let (mut server, mut client) = reliable_pair(19803);

    client.send(&eat(9)).unwrap();
    client.close().unwrap();

    // The event sent before the close still arrives...
    let got: Vec<Message> = receive_some(&mut server);
    assert_eq!(got, vec![eat(9)]);

    // ...and then the closed connection is fatal.
    let deadline = Instant::now() + Duration::from_secs(5);
    let err = loop {
        match server.receive::<Message>() {
            Ok(v) if v.is_empty() && Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(5));
            }
            Ok(v) => panic!("expected close, got {v:?}"),
            Err(e) => break e,
        }
    };
    assert!(matches!(err, TransportError::ConnectionClosed(_)));
}

#[test]
fn test_reliable_close_twice_is_harmless() {
    let (mut server, mut client) = reliable_pair(19804);
    client.close().unwrap();
    client.close().unwrap();
    server.close().unwrap();
    assert!(matches!(
        client.send(&eat(1)),
        Err(TransportError::NotReady)
    ));
}

#[test]
fn test_reliable_connect_without_host_fails() {
    // Nobody listens on this port.
    let mut client = ReliableChannel::new(addr(19805));
    let err = client.connect().unwrap_err();
    assert!(matches!(err, TransportError::ConnectFailed { .. }));
    assert!(!client.ready());
}

// =========================================================================
// Best-effort channel
// =========================================================================

#[test]
fn test_best_effort_host_connect_send_receive() {
    let (mut server, mut client) = best_effort_pair(19811);
    assert!(server.ready());
    assert!(client.ready());

    assert!(server.receive::<String>().unwrap().is_empty());
    assert!(client.receive::<String>().unwrap().is_empty());

    client.send(&"Hello world!".to_string()).unwrap();
    let got: Vec<String> = receive_some(&mut server);
    assert_eq!(got, vec!["Hello world!".to_string()]);

    server.send(&"Goodbye world!".to_string()).unwrap();
    let got: Vec<String> = receive_some(&mut client);
    assert_eq!(got, vec!["Goodbye world!".to_string()]);

    client.close().unwrap();
    server.close().unwrap();
}

#[test]
fn test_best_effort_ignores_other_senders() {
    let (mut server, mut client) = best_effort_pair(19812);

    // A stranger fires a datagram at the host's port.
    let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
    stranger.send_to(b"\x00\x00\x00\x02{}", addr(19812)).unwrap();

    client.send(&snapshot(1.0)).unwrap();
    let got: Vec<Message> = receive_some(&mut server);
    assert_eq!(got, vec![snapshot(1.0)]);

    // Give the stranger's datagram time to land, if it were accepted.
    thread::sleep(Duration::from_millis(20));
    assert!(server.receive::<Message>().unwrap().is_empty());
}

#[test]
fn test_best_effort_is_not_ready_after_bind_only() {
    let mut server = BestEffortChannel::new(addr(19813));
    server.bind().unwrap();
    assert!(!server.ready());
    assert!(server.local_addr().is_some());
    assert!(matches!(
        server.send(&snapshot(0.0)),
        Err(TransportError::NotReady)
    ));
}

// =========================================================================
// Isolation between the two channels of one address
// =========================================================================

#[test]
fn test_channels_on_same_port_do_not_leak_into_each_other() {
    let port = 19821;
    let (mut reliable_host, mut reliable_client) = reliable_pair(port);
    let (mut fast_host, mut fast_client) = best_effort_pair(port);

    fast_client.send(&snapshot(42.0)).unwrap();
    reliable_client.send(&eat(3)).unwrap();

    let on_fast: Vec<Message> = receive_some(&mut fast_host);
    let on_reliable: Vec<Message> = receive_some(&mut reliable_host);

    assert_eq!(on_fast, vec![snapshot(42.0)]);
    assert_eq!(on_reliable, vec![eat(3)]);

    // And nothing else turns up afterwards on either.
    thread::sleep(Duration::from_millis(20));
    assert!(fast_host.receive::<Message>().unwrap().is_empty());
    assert!(reliable_host.receive::<Message>().unwrap().is_empty());
}
