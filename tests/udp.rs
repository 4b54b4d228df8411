use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use lightnode::layout::Layout;
use lightnode::packet::{LightPacket, LinkKind, LinkPacket, NodeType};
use lightnode::{FrameLog, Handle, LightConfig, NodeConfig};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn client() -> UdpSocket {
    let socket = UdpSocket::bind(SocketAddr::new(LOCALHOST, 0)).unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    socket
}

/// A node on ephemeral ports that answers the session on `reply_port`.
fn config(reply_port: u16) -> NodeConfig {
    let mut config = NodeConfig::new(
        "loopback",
        vec![LightConfig {
            name: "strip".to_string(),
            layout: Layout::strip(4),
            gamma: Some(2.2),
        }],
    );
    config.bind = LOCALHOST;
    config.session_port = 0;
    config.command_port = 0;
    config.reply_port = reply_port;
    config
}

fn recv_link(socket: &UdpSocket) -> LinkPacket {
    let mut buf = [0u8; 1024];
    let (n, _) = socket.recv_from(&mut buf).unwrap();
    LinkPacket::decode(&buf[..n]).unwrap()
}

/// Skips keepalives until something else arrives.
fn recv_non_alive(socket: &UdpSocket) -> LinkPacket {
    loop {
        let packet = recv_link(socket);
        if packet.kind != LinkKind::Alive {
            return packet;
        }
    }
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn discovery_and_handshake() {
    let session = client();
    let handle = Handle::spawn(&config(session.local_addr().unwrap().port()), FrameLog).unwrap();
    assert!(!handle.is_connected());

    session
        .send_to(&LinkPacket::new(LinkKind::Ping).encode(), handle.session_addr())
        .unwrap();
    assert_eq!(recv_link(&session), LinkPacket::info(NodeType::Digital, 4));

    session
        .send_to(&LinkPacket::new(LinkKind::Init).encode(), handle.session_addr())
        .unwrap();
    assert_eq!(recv_link(&session), LinkPacket::ack());
    assert!(wait_for(|| handle.is_connected()));

    // Same host, so the reply lands on the bound reply port as well.
    let intruder = client();
    intruder
        .send_to(&LinkPacket::new(LinkKind::Init).encode(), handle.session_addr())
        .unwrap();
    assert_eq!(recv_non_alive(&session), LinkPacket::nack(LinkKind::Init));

    drop(handle);
}

#[test]
fn commands_are_answered_on_the_sending_socket() {
    let session = client();
    let handle = Handle::spawn(&config(session.local_addr().unwrap().port()), FrameLog).unwrap();
    let command = client();
    let mut buf = [0u8; 1024];

    command
        .send_to(&LightPacket::node_info().encode(), handle.command_addr())
        .unwrap();
    let (n, from) = command.recv_from(&mut buf).unwrap();
    assert_eq!(from, handle.command_addr());
    assert_eq!(
        LightPacket::decode(&buf[..n]).unwrap(),
        LightPacket::node_info_response(1, "loopback")
    );

    command
        .send_to(&LightPacket::light_info(0).encode(), handle.command_addr())
        .unwrap();
    let (n, _) = command.recv_from(&mut buf).unwrap();
    assert_eq!(
        LightPacket::decode(&buf[..n]).unwrap(),
        LightPacket::light_info_response(0, 4, "strip")
    );
}

#[test]
fn keepalive_then_timeout() {
    let session = client();
    let mut config = config(session.local_addr().unwrap().port());
    config.alive_interval_ms = 20;
    config.watchdog_timeout_ms = 150;
    let handle = Handle::spawn(&config, FrameLog).unwrap();

    session
        .send_to(&LinkPacket::new(LinkKind::Init).encode(), handle.session_addr())
        .unwrap();
    assert_eq!(recv_link(&session), LinkPacket::ack());
    assert_eq!(recv_link(&session), LinkPacket::alive());

    // The client never answers, so the node gives up on it.
    assert!(wait_for(|| !handle.is_connected()));

    session
        .send_to(&LinkPacket::new(LinkKind::Init).encode(), handle.session_addr())
        .unwrap();
    assert_eq!(recv_non_alive(&session), LinkPacket::ack());
}

#[test]
fn bind_conflict_is_reported() {
    let taken = UdpSocket::bind(SocketAddr::new(LOCALHOST, 0)).unwrap();
    let mut config = config(0);
    config.session_port = taken.local_addr().unwrap().port();
    assert!(Handle::spawn(&config, FrameLog).is_err());
}
