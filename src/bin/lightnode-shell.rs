use std::io::Write;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use clap::Parser;

use lightnode::args::ShellArgs;
use lightnode::color::Hsv;
use lightnode::command::{ChannelMask, Channels, ColorUpdate};
use lightnode::packet::{LightKind, LightPacket, LinkKind, LinkPacket};

macro_rules! skip_fail {
    ($res:expr) => {
        match $res {
            Ok(val) => val,
            Err(e) => {
                println!("Invalid value: {}", e);
                continue;
            }
        }
    };
}

const HELP: &str = "Valid commands are: ping, init, frame H S V, node, light ID, \
on ID PERIOD, off ID PERIOD, hsv ID H S V PERIOD, brightness ID DELTA PERIOD";

struct Shell {
    session: UdpSocket,
    command: UdpSocket,
    session_addr: SocketAddr,
    command_addr: SocketAddr,
    // Learned from the last info reply.
    pixel_count: usize,
}

impl Shell {
    fn send_link(&self, packet: LinkPacket) -> anyhow::Result<()> {
        self.session.send_to(&packet.encode(), self.session_addr)?;
        return Ok(());
    }

    fn send_light(&self, packet: LightPacket) -> anyhow::Result<()> {
        self.command.send_to(&packet.encode(), self.command_addr)?;
        return Ok(());
    }

    /// Prints whatever arrived on either socket since the last command.
    fn drain(&mut self) {
        let mut buf = [0u8; 2048];
        while let Ok((n, from)) = self.session.recv_from(&mut buf) {
            match LinkPacket::decode(&buf[..n]) {
                Ok(packet) => {
                    if packet.kind == LinkKind::Info && packet.payload.len() == 3 {
                        self.pixel_count =
                            u16::from_be_bytes([packet.payload[1], packet.payload[2]]) as usize;
                    }
                    println!("{} -> {:?}", from, packet);
                }
                Err(e) => println!("{} -> malformed session reply: {}", from, e),
            }
        }
        while let Ok((n, from)) = self.command.recv_from(&mut buf) {
            match LightPacket::decode(&buf[..n]) {
                Ok(packet) => print_light_reply(from, &packet),
                Err(e) => println!("{} -> malformed command reply: {}", from, e),
            }
        }
    }
}

fn print_light_reply(from: SocketAddr, packet: &LightPacket) {
    match packet.kind {
        LightKind::NodeInfoResponse if !packet.payload.is_empty() => println!(
            "{} -> node '{}' with {} lights",
            from,
            String::from_utf8_lossy(&packet.payload[1..]),
            packet.payload[0]
        ),
        LightKind::LightInfoResponse if packet.payload.len() >= 2 => println!(
            "{} -> light {} '{}' with {} leds",
            from,
            packet.light,
            String::from_utf8_lossy(&packet.payload[2..]),
            u16::from_be_bytes([packet.payload[0], packet.payload[1]])
        ),
        _ => println!("{} -> {:?}", from, packet),
    }
}

/// A shell for interactive debugging.
fn main() -> anyhow::Result<()> {
    let args = ShellArgs::parse();
    let session = UdpSocket::bind(("0.0.0.0", args.reply_port))?;
    let command = UdpSocket::bind(("0.0.0.0", 0))?;
    session.set_read_timeout(Some(Duration::from_millis(200)))?;
    command.set_read_timeout(Some(Duration::from_millis(200)))?;
    let mut shell = Shell {
        session,
        command,
        session_addr: SocketAddr::new(args.node, args.session_port),
        command_addr: SocketAddr::new(args.node, args.command_port),
        pixel_count: 0,
    };

    let mut input = String::new();
    loop {
        print!("lightnode> ");
        std::io::stdout().flush()?;
        input.clear();
        if std::io::stdin().read_line(&mut input)? == 0 {
            return Ok(());
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        let numbers: Vec<Result<i16, _>> = words.iter().skip(1).map(|w| w.parse::<i16>()).collect();
        let arg = |i: usize| -> anyhow::Result<i16> {
            match numbers.get(i) {
                Some(Ok(value)) => Ok(*value),
                Some(Err(e)) => Err(anyhow::anyhow!("argument {}: {}", i + 1, e)),
                None => Err(anyhow::anyhow!("missing argument {}", i + 1)),
            }
        };

        let sent = match words.first().copied() {
            None => continue,
            Some("help") => {
                println!("{}", HELP);
                continue;
            }
            Some("ping") => shell.send_link(LinkPacket::new(LinkKind::Ping)),
            Some("init") => shell.send_link(LinkPacket::new(LinkKind::Init)),
            Some("frame") => {
                let hsv = Hsv::new(skip_fail!(arg(0)) as u8, skip_fail!(arg(1)) as u8, skip_fail!(arg(2)) as u8);
                let mut payload = Vec::with_capacity(3 * shell.pixel_count);
                for _ in 0..shell.pixel_count {
                    payload.extend([hsv.h, hsv.s, hsv.v]);
                }
                shell.send_link(LinkPacket {
                    kind: LinkKind::Update,
                    payload,
                })
            }
            Some("node") => shell.send_light(LightPacket::node_info()),
            Some("light") => shell.send_light(LightPacket::light_info(skip_fail!(arg(0)) as u8)),
            Some("on") => shell.send_light(LightPacket::turn_on(
                skip_fail!(arg(0)) as u8,
                skip_fail!(arg(1)) as u8,
            )),
            Some("off") => shell.send_light(LightPacket::turn_off(
                skip_fail!(arg(0)) as u8,
                skip_fail!(arg(1)) as u8,
            )),
            Some("hsv") => {
                let light = skip_fail!(arg(0)) as u8;
                let hsv = Hsv::new(skip_fail!(arg(1)) as u8, skip_fail!(arg(2)) as u8, skip_fail!(arg(3)) as u8);
                let period = skip_fail!(arg(4)) as u8;
                let update = ColorUpdate::broadcast(
                    ChannelMask::ALL,
                    Channels::from(Hsv::new(period, period, period)),
                    Channels::from(hsv),
                );
                shell.send_light(update.into_packet(light))
            }
            Some("brightness") => shell.send_light(LightPacket::change_brightness(
                skip_fail!(arg(0)) as u8,
                skip_fail!(arg(2)) as u8,
                skip_fail!(arg(1)) as i8,
            )),
            Some(other) => {
                println!("unknown command {}", other);
                continue;
            }
        };
        skip_fail!(sent);
        std::thread::sleep(Duration::from_millis(50));
        shell.drain();
    }
}
