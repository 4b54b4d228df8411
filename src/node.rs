use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::color::Hsv;
use crate::command::{Channels, ColorUpdate, ColorValues, Command};
use crate::config::NodeConfig;
use crate::error::{CommandError, ConfigError};
use crate::led::Led;
use crate::light::{period_ticks, Light};
use crate::output::LightOutput;
use crate::packet::{LightKind, LightPacket};
use crate::session::{Session, SessionAction};

const BUFFER_SIZE: usize = 65535;

/// An outgoing datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub to: SocketAddr,
    pub bytes: Vec<u8>,
}

/// The two sockets a node listens on.
pub struct Sockets {
    pub session: UdpSocket,
    pub command: UdpSocket,
}

impl Sockets {
    /// Must be called from within a tokio runtime.
    pub fn from_std(
        session: std::net::UdpSocket,
        command: std::net::UdpSocket,
    ) -> std::io::Result<Sockets> {
        session.set_nonblocking(true)?;
        command.set_nonblocking(true)?;
        return Ok(Sockets {
            session: UdpSocket::from_std(session)?,
            command: UdpSocket::from_std(command)?,
        });
    }
}

/// Owns the session and every light, and routes traffic between them.
///
/// All methods take the current time explicitly and return the datagrams to
/// send; `run` wires them to real sockets and timers.
pub struct Node<O: LightOutput> {
    name: String,
    session: Session,
    lights: Vec<Light>,
    output: O,
    connected: Arc<AtomicBool>,
}

impl<O: LightOutput> Node<O> {
    pub fn new(config: &NodeConfig, output: O) -> Result<Node<O>, ConfigError> {
        config.validate()?;
        return Ok(Node {
            name: config.name.clone(),
            session: Session::new(config.session()),
            lights: config.build_lights()?,
            output,
            connected: Arc::new(AtomicBool::new(false)),
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light(&self, id: u8) -> Option<&Light> {
        self.lights.get(id as usize)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// A flag mirroring the session state, readable from other threads.
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.lights
            .iter()
            .filter_map(Light::next_deadline)
            .chain(self.session.next_deadline())
            .min()
    }

    pub fn handle_session_datagram(
        &mut self,
        bytes: &[u8],
        from: SocketAddr,
        now: Instant,
    ) -> Vec<Datagram> {
        let actions = self.session.handle_datagram(bytes, from, now);
        return self.perform(actions, now);
    }

    pub fn handle_command_datagram(
        &mut self,
        bytes: &[u8],
        from: SocketAddr,
        now: Instant,
    ) -> Option<Datagram> {
        let packet = match LightPacket::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%from, "dropping command datagram: {}", e);
                return None;
            }
        };

        let from_client = self.session.is_client_host(from);
        if from_client {
            self.session.feed_watchdog(now);
        }

        let led_count = match packet.kind {
            LightKind::NodeInfo => 0,
            _ => match self.light(packet.light) {
                Some(light) => light.len(),
                None => {
                    warn!(%from, "{}", CommandError::UnknownLight(packet.light));
                    return None;
                }
            },
        };
        let command = match Command::parse(&packet, led_count) {
            Ok(command) => command,
            Err(e) => {
                warn!(%from, light = packet.light, "invalid {}: {}", packet.kind.name(), e);
                return None;
            }
        };
        if command.is_mutating() && self.session.is_connected() && !from_client {
            warn!(%from, "ignoring {} from outside the session", packet.kind.name());
            return None;
        }

        match self.apply(packet.light, command, now) {
            Ok(Some(reply)) => Some(Datagram {
                to: from,
                bytes: reply.encode(),
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(%from, light = packet.light, "{} failed: {}", packet.kind.name(), e);
                None
            }
        }
    }

    /// Executes a validated command. Mutating commands start a transition
    /// on the light; info commands return the reply to send.
    pub fn apply(
        &mut self,
        light_id: u8,
        command: Command,
        now: Instant,
    ) -> Result<Option<LightPacket>, CommandError> {
        match command {
            Command::NodeInfo => {
                let count = self.lights.len() as u8;
                Ok(Some(LightPacket::node_info_response(count, &self.name)))
            }
            command => {
                let light = self
                    .lights
                    .get_mut(light_id as usize)
                    .ok_or(CommandError::UnknownLight(light_id))?;
                apply_to_light(light, light_id, command, now)
            }
        }
    }

    /// Spreads a session frame over the lights, in light order.
    pub fn apply_frame(&mut self, frame: &[Hsv], now: Instant) -> Result<(), CommandError> {
        let expected: usize = self.lights.iter().map(Light::len).sum();
        if frame.len() != expected {
            return Err(CommandError::FrameSize {
                expected,
                actual: frame.len(),
            });
        }
        let mut pixels = frame.iter();
        for light in &mut self.lights {
            for (led, hsv) in light.leds_mut().iter_mut().zip(&mut pixels) {
                led.set_hsv(*hsv);
            }
            light.start_transition(now);
        }
        return Ok(());
    }

    /// Runs every timer that is due: session keepalive and watchdog, and
    /// each light's transition ticks.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<Datagram> {
        let actions = self.session.poll_timers(now);
        let datagrams = self.perform(actions, now);

        let output = &mut self.output;
        for (id, light) in self.lights.iter_mut().enumerate() {
            light.poll(now, |light| output.light_changed(id as u8, light));
        }
        return datagrams;
    }

    fn perform(&mut self, actions: Vec<SessionAction>, now: Instant) -> Vec<Datagram> {
        let mut datagrams = Vec::new();
        for action in actions {
            match action {
                SessionAction::Send { to, packet } => datagrams.push(Datagram {
                    to,
                    bytes: packet.encode(),
                }),
                SessionAction::Frame(frame) => {
                    if let Err(e) = self.apply_frame(&frame, now) {
                        warn!("dropping frame: {}", e);
                    }
                }
                SessionAction::Connected(_) | SessionAction::Disconnected => {
                    self.connected
                        .store(self.session.is_connected(), Ordering::SeqCst);
                }
            }
        }
        return datagrams;
    }

    /// Serves both sockets until `shutdown` fires or its sender is dropped.
    pub async fn run(mut self, sockets: Sockets, mut shutdown: oneshot::Receiver<()>) {
        let mut session_buf = vec![0u8; BUFFER_SIZE];
        let mut command_buf = vec![0u8; BUFFER_SIZE];

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(node = %self.name, "shutting down");
                    break;
                }
                received = sockets.session.recv_from(&mut session_buf) => match received {
                    Ok((n, from)) => {
                        let out = self.handle_session_datagram(&session_buf[..n], from, Instant::now());
                        send_all(&sockets.session, out).await;
                    }
                    Err(e) => warn!("session receive failed: {}", e),
                },
                received = sockets.command.recv_from(&mut command_buf) => match received {
                    Ok((n, from)) => {
                        let reply = self.handle_command_datagram(&command_buf[..n], from, Instant::now());
                        send_all(&sockets.command, reply).await;
                    }
                    Err(e) => warn!("command receive failed: {}", e),
                },
                _ = sleep_until(deadline) => {
                    let out = self.poll_timers(Instant::now());
                    send_all(&sockets.session, out).await;
                }
            }
        }
    }
}

fn apply_to_light(
    light: &mut Light,
    light_id: u8,
    command: Command,
    now: Instant,
) -> Result<Option<LightPacket>, CommandError> {
    match command {
        // Answered by the node itself.
        Command::NodeInfo => return Ok(None),
        Command::LightInfo => {
            let count = light.len() as u16;
            return Ok(Some(LightPacket::light_info_response(
                light_id,
                count,
                light.name(),
            )));
        }
        Command::TurnOn { period } => {
            light.set_val_period(period_ticks(period));
            light.turn_on();
        }
        Command::TurnOff { period } => {
            light.set_val_period(period_ticks(period));
            light.turn_off();
        }
        Command::ChangeBrightness { period, delta } => {
            // Lights are driven in unison, so the first led is the reference.
            let reference = match light.leds().first() {
                Some(led) => led.target().v,
                None => return Ok(None),
            };
            let value = brightness_after(reference, delta);
            light.set_val_period(period_ticks(period));
            for led in light.leds_mut() {
                led.set_val(value);
            }
        }
        Command::UpdateColor(update) => update_color(light, &update)?,
    }

    light.start_transition(now);
    return Ok(None);
}

/// `delta` percent of full scale, relative to `reference`, clamped to a byte.
pub fn brightness_after(reference: u8, delta: i8) -> u8 {
    let step = (delta as f32 * 255.0 / 100.0).round() as i32;
    return (reference as i32 + step).clamp(0, 255) as u8;
}

fn update_color(light: &mut Light, update: &ColorUpdate) -> Result<(), CommandError> {
    if let ColorValues::PerPixel(pixels) = &update.values {
        if pixels.len() != light.len() {
            return Err(CommandError::FrameSize {
                expected: light.len(),
                actual: pixels.len(),
            });
        }
    }

    if let Some(period) = update.periods.hue {
        light.set_hue_period(period_ticks(period));
    }
    if let Some(period) = update.periods.sat {
        light.set_sat_period(period_ticks(period));
    }
    if let Some(period) = update.periods.val {
        light.set_val_period(period_ticks(period));
    }

    match &update.values {
        ColorValues::Broadcast(values) => {
            for led in light.leds_mut() {
                set_channels(led, values);
            }
        }
        ColorValues::PerPixel(pixels) => {
            for (led, values) in light.leds_mut().iter_mut().zip(pixels) {
                set_channels(led, values);
            }
        }
    }
    return Ok(());
}

fn set_channels(led: &mut Led, channels: &Channels) {
    if let Some(hue) = channels.hue {
        led.set_hue(hue);
    }
    if let Some(sat) = channels.sat {
        led.set_sat(sat);
    }
    if let Some(val) = channels.val {
        led.set_val(val);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn send_all(socket: &UdpSocket, datagrams: impl IntoIterator<Item = Datagram>) {
    for datagram in datagrams {
        if let Err(e) = socket.send_to(&datagram.bytes, datagram.to).await {
            warn!(to = %datagram.to, "send failed: {}", e);
        }
    }
}
