use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::color::Hsv;
use crate::packet::{LinkKind, LinkPacket, NodeType};
use crate::timer::{Fire, Timer};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected { client: SocketAddr },
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub node_type: NodeType,
    pub pixel_count: u16,
    /// Replies go to the sender's ip on this port.
    pub reply_port: u16,
    pub alive_interval: Duration,
    pub watchdog_timeout: Duration,
}

/// Something the session wants the node to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    Send { to: SocketAddr, packet: LinkPacket },
    /// A validated pixel frame from the client, one color per pixel.
    Frame(Vec<Hsv>),
    Connected(SocketAddr),
    Disconnected,
}

/// The single-client keepalive protocol.
///
/// A client connects with `Init`, after which the node sends `Alive` every
/// alive interval. Any in-band traffic other than `Ping` feeds the watchdog;
/// if it runs out the client is dropped and a new `Init` is required.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: ConnectionState,
    alive: Timer,
    watchdog: Timer,
}

impl Session {
    pub fn new(config: SessionConfig) -> Session {
        return Session {
            config,
            state: ConnectionState::Disconnected,
            alive: Timer::new(),
            watchdog: Timer::new(),
        };
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    pub fn client(&self) -> Option<SocketAddr> {
        match self.state {
            ConnectionState::Connected { client } => Some(client),
            ConnectionState::Disconnected => None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a datagram from `from` comes from the bound client.
    pub fn is_in_band(&self, from: SocketAddr) -> bool {
        self.client() == Some(self.respond_to(from))
    }

    /// Whether `from` shares the bound client's ip address, whatever the port.
    pub fn is_client_host(&self, from: SocketAddr) -> bool {
        self.client().map(|client| client.ip()) == Some(from.ip())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        [self.alive.deadline(), self.watchdog.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn feed_watchdog(&mut self, now: Instant) {
        self.watchdog.cancel();
        self.watchdog.schedule(now + self.config.watchdog_timeout);
    }

    fn respond_to(&self, from: SocketAddr) -> SocketAddr {
        SocketAddr::new(from.ip(), self.config.reply_port)
    }

    pub fn handle_datagram(
        &mut self,
        bytes: &[u8],
        from: SocketAddr,
        now: Instant,
    ) -> Vec<SessionAction> {
        let kind = match LinkPacket::raw_kind(bytes) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(%from, "dropping session datagram: {}", e);
                return Vec::new();
            }
        };

        // Unknown kinds from the client still count as liveness.
        let respond = self.respond_to(from);
        let in_band = self.is_in_band(from);
        if in_band && kind != LinkKind::Ping as u8 {
            self.feed_watchdog(now);
        }

        let packet = match LinkPacket::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%from, "dropping session datagram: {}", e);
                return Vec::new();
            }
        };

        let mut actions = Vec::new();
        match packet.kind {
            LinkKind::Ping => {
                if !in_band {
                    debug!(to = %respond, "sending info");
                    actions.push(self.send(
                        respond,
                        LinkPacket::info(self.config.node_type, self.config.pixel_count),
                    ));
                }
            }
            LinkKind::Init => {
                if self.is_connected() {
                    warn!(%from, "rejecting init, a client is already connected");
                    actions.push(self.send(respond, LinkPacket::nack(LinkKind::Init)));
                } else {
                    actions.push(self.send(respond, LinkPacket::ack()));
                    self.state = ConnectionState::Connected { client: respond };
                    self.alive.schedule(now + self.config.alive_interval);
                    self.feed_watchdog(now);
                    info!(client = %respond, "client connected");
                    actions.push(SessionAction::Connected(respond));
                }
            }
            LinkKind::Update => {
                if !in_band {
                    warn!(%from, "update from outside the session");
                    actions.push(self.send(respond, LinkPacket::nack(LinkKind::Update)));
                } else {
                    match self.decode_frame(&packet.payload) {
                        Some(frame) => actions.push(SessionAction::Frame(frame)),
                        None => {
                            actions.push(self.send(respond, LinkPacket::nack(LinkKind::Update)))
                        }
                    }
                }
            }
            other => {
                warn!(%from, "unimplemented packet kind received: {:?}", other);
            }
        }
        return actions;
    }

    fn decode_frame(&self, payload: &[u8]) -> Option<Vec<Hsv>> {
        let expected = 3 * self.config.pixel_count as usize;
        if payload.len() != expected {
            warn!(
                "invalid update payload length {} (expected {})",
                payload.len(),
                expected
            );
            return None;
        }
        let frame = payload
            .chunks_exact(3)
            .map(|hsv| Hsv::new(hsv[0], hsv[1], hsv[2]))
            .collect();
        return Some(frame);
    }

    fn send(&self, to: SocketAddr, packet: LinkPacket) -> SessionAction {
        SessionAction::Send { to, packet }
    }

    /// Fires the alive and watchdog timers if they are due.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        // Collect both tokens before firing either: an expiring watchdog
        // cancels an alive tick that is due at the same time.
        let watchdog = self.watchdog.due(now);
        let alive = self.alive.due(now);

        if let Some(token) = watchdog {
            if self.watchdog.fire(token) == Fire::Fired {
                self.watchdog.finish();
                self.alive.cancel();
                if let Some(client) = self.client() {
                    info!(%client, "client timed out");
                }
                self.state = ConnectionState::Disconnected;
                actions.push(SessionAction::Disconnected);
            }
        }

        if let Some(token) = alive {
            if self.alive.fire(token) == Fire::Fired {
                if let Some(client) = self.client() {
                    actions.push(self.send(client, LinkPacket::alive()));
                }
                self.alive.schedule(now + self.config.alive_interval);
            }
        }
        return actions;
    }
}
