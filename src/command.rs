use crate::color::Hsv;
use crate::error::CommandError;
use crate::packet::{LightKind, LightPacket};

/// Selects which of hue (bit 2), saturation (bit 1) and value (bit 0) a
/// color update carries. Values are always laid out hue, saturation, value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const VAL: u8 = 0x01;
    pub const SAT: u8 = 0x02;
    pub const HUE: u8 = 0x04;
    pub const ALL: ChannelMask = ChannelMask(0x07);

    pub fn new(bits: u8) -> Result<ChannelMask, CommandError> {
        if bits == 0 {
            return Err(CommandError::EmptyChannelMask);
        }
        if bits & !Self::ALL.0 != 0 {
            return Err(CommandError::InvalidChannelMask(bits));
        }
        return Ok(ChannelMask(bits));
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn hue(&self) -> bool {
        self.0 & Self::HUE != 0
    }

    pub fn sat(&self) -> bool {
        self.0 & Self::SAT != 0
    }

    pub fn val(&self) -> bool {
        self.0 & Self::VAL != 0
    }

    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }
}

/// Channels present in one color update; absent channels keep their target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Channels {
    pub hue: Option<u8>,
    pub sat: Option<u8>,
    pub val: Option<u8>,
}

impl Channels {
    fn read(mask: ChannelMask, bytes: &[u8]) -> Channels {
        let mut values = bytes.iter().copied();
        Channels {
            hue: mask.hue().then(|| values.next()).flatten(),
            sat: mask.sat().then(|| values.next()).flatten(),
            val: mask.val().then(|| values.next()).flatten(),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend(self.hue);
        out.extend(self.sat);
        out.extend(self.val);
    }
}

impl From<Hsv> for Channels {
    fn from(hsv: Hsv) -> Channels {
        Channels {
            hue: Some(hsv.h),
            sat: Some(hsv.s),
            val: Some(hsv.v),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorValues {
    Broadcast(Channels),
    PerPixel(Vec<Channels>),
}

/// A decoded `UpdateColor` payload: `[mask, periods..., values...]` with one
/// period byte per selected channel followed by either a single value tuple
/// or one tuple per led.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorUpdate {
    pub mask: ChannelMask,
    /// Periods in hundredths of a second, for the selected channels only.
    pub periods: Channels,
    pub values: ColorValues,
}

impl ColorUpdate {
    pub fn broadcast(mask: ChannelMask, periods: Channels, values: Channels) -> ColorUpdate {
        ColorUpdate {
            mask,
            periods,
            values: ColorValues::Broadcast(values),
        }
    }

    pub fn per_pixel(mask: ChannelMask, periods: Channels, values: Vec<Channels>) -> ColorUpdate {
        ColorUpdate {
            mask,
            periods,
            values: ColorValues::PerPixel(values),
        }
    }

    pub fn decode(payload: &[u8], led_count: usize) -> Result<ColorUpdate, CommandError> {
        let bits = match payload.first() {
            Some(bits) => *bits,
            None => return Err(CommandError::EmptyChannelMask),
        };
        let mask = ChannelMask::new(bits)?;
        let stride = mask.count();

        let broadcast = 1 + stride + stride;
        let per_pixel = 1 + stride + stride * led_count;
        let values_start = 1 + stride;
        let periods = Channels::read(mask, &payload[1..]);

        if payload.len() == broadcast {
            let values = Channels::read(mask, &payload[values_start..]);
            return Ok(ColorUpdate::broadcast(mask, periods, values));
        }
        if payload.len() == per_pixel {
            let values = payload[values_start..]
                .chunks_exact(stride)
                .map(|chunk| Channels::read(mask, chunk))
                .collect();
            return Ok(ColorUpdate::per_pixel(mask, periods, values));
        }
        return Err(CommandError::ColorLength {
            actual: payload.len(),
            broadcast,
            per_pixel,
        });
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = vec![self.mask.bits()];
        self.periods.write(&mut payload);
        match &self.values {
            ColorValues::Broadcast(values) => values.write(&mut payload),
            ColorValues::PerPixel(pixels) => {
                for values in pixels {
                    values.write(&mut payload);
                }
            }
        }
        return payload;
    }

    pub fn into_packet(self, light: u8) -> LightPacket {
        LightPacket::with_payload(LightKind::UpdateColor, light, self.encode())
    }
}

/// A validated request to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    NodeInfo,
    LightInfo,
    TurnOn { period: u8 },
    TurnOff { period: u8 },
    /// `delta` is a percentage of full scale in -100..=100.
    ChangeBrightness { period: u8, delta: i8 },
    UpdateColor(ColorUpdate),
}

impl Command {
    /// Validates the payload of `packet` for a light with `led_count` leds.
    pub fn parse(packet: &LightPacket, led_count: usize) -> Result<Command, CommandError> {
        let payload = &packet.payload;
        let command = match packet.kind {
            LightKind::NodeInfo => Command::NodeInfo,
            LightKind::LightInfo => Command::LightInfo,
            LightKind::TurnOn => Command::TurnOn {
                period: exact::<1>(packet.kind, payload)?[0],
            },
            LightKind::TurnOff => Command::TurnOff {
                period: exact::<1>(packet.kind, payload)?[0],
            },
            LightKind::ChangeBrightness => {
                let [period, delta] = exact::<2>(packet.kind, payload)?;
                let delta = delta as i8;
                if !(-100..=100).contains(&delta) {
                    return Err(CommandError::BrightnessOutOfRange(delta));
                }
                Command::ChangeBrightness { period, delta }
            }
            LightKind::UpdateColor => {
                Command::UpdateColor(ColorUpdate::decode(payload, led_count)?)
            }
            LightKind::NodeInfoResponse | LightKind::LightInfoResponse => {
                return Err(CommandError::NotACommand(packet.kind.name()))
            }
        };
        return Ok(command);
    }

    /// Whether the command changes light state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::NodeInfo | Command::LightInfo)
    }
}

fn exact<const N: usize>(kind: LightKind, payload: &[u8]) -> Result<[u8; N], CommandError> {
    payload
        .try_into()
        .map_err(|_| CommandError::PayloadLength {
            kind: kind.name(),
            expected: N,
            actual: payload.len(),
        })
}
