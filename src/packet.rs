//! Wire formats.
//!
//! Two framings share this module:
//!
//! * the session (keepalive) protocol: `[0xAA, 0x55, kind, payload...]`
//! * the command protocol: `[0xAA, light, kind, payload...]`

use crate::error::FormatError;

/// Big-endian magic at the start of every session datagram.
pub const LINK_HEADER: u16 = 0xAA55;

/// First byte of every command datagram.
pub const COMMAND_HEADER: u8 = 0xAA;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Ping = 0x00,
    Init = 0x01,
    Info = 0x02,
    Update = 0x03,
    Alive = 0x04,
    Ack = 0xFE,
    Nack = 0xFF,
}

impl TryFrom<u8> for LinkKind {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0x00 => LinkKind::Ping,
            0x01 => LinkKind::Init,
            0x02 => LinkKind::Info,
            0x03 => LinkKind::Update,
            0x04 => LinkKind::Alive,
            0xFE => LinkKind::Ack,
            0xFF => LinkKind::Nack,
            other => return Err(FormatError::UnknownKind(other)),
        };
        return Ok(kind);
    }
}

/// The kind of hardware a node drives, advertised in `Info`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Analog = 0,
    Digital = 1,
    Matrix = 2,
}

/// A session protocol datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPacket {
    pub kind: LinkKind,
    pub payload: Vec<u8>,
}

impl LinkPacket {
    pub const MIN_LEN: usize = 3;

    pub fn new(kind: LinkKind) -> LinkPacket {
        LinkPacket {
            kind,
            payload: Vec::new(),
        }
    }

    pub fn ack() -> LinkPacket {
        LinkPacket::new(LinkKind::Ack)
    }

    pub fn alive() -> LinkPacket {
        LinkPacket::new(LinkKind::Alive)
    }

    pub fn nack(rejected: LinkKind) -> LinkPacket {
        LinkPacket {
            kind: LinkKind::Nack,
            payload: vec![rejected as u8],
        }
    }

    pub fn info(node_type: NodeType, pixel_count: u16) -> LinkPacket {
        let mut payload = vec![node_type as u8];
        payload.extend_from_slice(&pixel_count.to_be_bytes());
        LinkPacket {
            kind: LinkKind::Info,
            payload,
        }
    }

    /// Checks length and magic only, returning the raw kind byte.
    pub fn raw_kind(bytes: &[u8]) -> Result<u8, FormatError> {
        if bytes.len() < Self::MIN_LEN {
            return Err(FormatError::TooShort {
                len: bytes.len(),
                min: Self::MIN_LEN,
            });
        }
        let header = u16::from_be_bytes([bytes[0], bytes[1]]);
        if header != LINK_HEADER {
            return Err(FormatError::BadHeader(header));
        }
        return Ok(bytes[2]);
    }

    pub fn decode(bytes: &[u8]) -> Result<LinkPacket, FormatError> {
        let kind = LinkKind::try_from(Self::raw_kind(bytes)?)?;
        return Ok(LinkPacket {
            kind,
            payload: bytes[3..].to_vec(),
        });
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut datagram = Vec::with_capacity(Self::MIN_LEN + self.payload.len());
        datagram.extend_from_slice(&LINK_HEADER.to_be_bytes());
        datagram.push(self.kind as u8);
        datagram.extend_from_slice(&self.payload);
        return datagram;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LightKind {
    NodeInfo = 0x00,
    LightInfo = 0x01,
    TurnOn = 0x02,
    TurnOff = 0x03,
    UpdateColor = 0x04,
    ChangeBrightness = 0x05,
    NodeInfoResponse = 0x80,
    LightInfoResponse = 0x81,
}

impl LightKind {
    pub fn name(&self) -> &'static str {
        match self {
            LightKind::NodeInfo => "NodeInfo",
            LightKind::LightInfo => "LightInfo",
            LightKind::TurnOn => "TurnOn",
            LightKind::TurnOff => "TurnOff",
            LightKind::UpdateColor => "UpdateColor",
            LightKind::ChangeBrightness => "ChangeBrightness",
            LightKind::NodeInfoResponse => "NodeInfoResponse",
            LightKind::LightInfoResponse => "LightInfoResponse",
        }
    }
}

impl TryFrom<u8> for LightKind {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0x00 => LightKind::NodeInfo,
            0x01 => LightKind::LightInfo,
            0x02 => LightKind::TurnOn,
            0x03 => LightKind::TurnOff,
            0x04 => LightKind::UpdateColor,
            0x05 => LightKind::ChangeBrightness,
            0x80 => LightKind::NodeInfoResponse,
            0x81 => LightKind::LightInfoResponse,
            other => return Err(FormatError::UnknownKind(other)),
        };
        return Ok(kind);
    }
}

/// A command protocol datagram addressed to one light of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightPacket {
    pub light: u8,
    pub kind: LightKind,
    pub payload: Vec<u8>,
}

impl LightPacket {
    pub const MIN_LEN: usize = 3;

    pub fn new(kind: LightKind, light: u8) -> LightPacket {
        LightPacket {
            light,
            kind,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(kind: LightKind, light: u8, payload: Vec<u8>) -> LightPacket {
        LightPacket {
            light,
            kind,
            payload,
        }
    }

    pub fn node_info() -> LightPacket {
        LightPacket::new(LightKind::NodeInfo, 0)
    }

    pub fn node_info_response(light_count: u8, name: &str) -> LightPacket {
        let mut payload = vec![light_count];
        payload.extend_from_slice(name.as_bytes());
        LightPacket::with_payload(LightKind::NodeInfoResponse, 0, payload)
    }

    pub fn light_info(light: u8) -> LightPacket {
        LightPacket::new(LightKind::LightInfo, light)
    }

    pub fn light_info_response(light: u8, led_count: u16, name: &str) -> LightPacket {
        let mut payload = led_count.to_be_bytes().to_vec();
        payload.extend_from_slice(name.as_bytes());
        LightPacket::with_payload(LightKind::LightInfoResponse, light, payload)
    }

    pub fn turn_on(light: u8, period: u8) -> LightPacket {
        LightPacket::with_payload(LightKind::TurnOn, light, vec![period])
    }

    pub fn turn_off(light: u8, period: u8) -> LightPacket {
        LightPacket::with_payload(LightKind::TurnOff, light, vec![period])
    }

    pub fn change_brightness(light: u8, period: u8, delta: i8) -> LightPacket {
        LightPacket::with_payload(
            LightKind::ChangeBrightness,
            light,
            vec![period, delta as u8],
        )
    }

    pub fn decode(bytes: &[u8]) -> Result<LightPacket, FormatError> {
        if bytes.len() < Self::MIN_LEN {
            return Err(FormatError::TooShort {
                len: bytes.len(),
                min: Self::MIN_LEN,
            });
        }
        if bytes[0] != COMMAND_HEADER {
            return Err(FormatError::BadHeader(bytes[0] as u16));
        }
        let kind = LightKind::try_from(bytes[2])?;
        return Ok(LightPacket {
            light: bytes[1],
            kind,
            payload: bytes[3..].to_vec(),
        });
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut datagram = Vec::with_capacity(Self::MIN_LEN + self.payload.len());
        datagram.push(COMMAND_HEADER);
        datagram.push(self.light);
        datagram.push(self.kind as u8);
        datagram.extend_from_slice(&self.payload);
        return datagram;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_round_trip() {
        let packets = [
            LinkPacket::new(LinkKind::Ping),
            LinkPacket::new(LinkKind::Init),
            LinkPacket::info(NodeType::Matrix, 300),
            LinkPacket {
                kind: LinkKind::Update,
                payload: vec![1, 2, 3, 4, 5, 6],
            },
            LinkPacket::alive(),
            LinkPacket::ack(),
            LinkPacket::nack(LinkKind::Update),
        ];
        for packet in packets {
            assert_eq!(LinkPacket::decode(&packet.encode()), Ok(packet));
        }
    }

    #[test]
    fn link_wire_layout() {
        assert_eq!(
            LinkPacket::info(NodeType::Digital, 0x0102).encode(),
            vec![0xAA, 0x55, 0x02, 0x01, 0x01, 0x02]
        );
        assert_eq!(
            LinkPacket::nack(LinkKind::Init).encode(),
            vec![0xAA, 0x55, 0xFF, 0x01]
        );
    }

    #[test]
    fn link_rejects_malformed() {
        assert_eq!(
            LinkPacket::decode(&[0xAA, 0x55]),
            Err(FormatError::TooShort { len: 2, min: 3 })
        );
        assert_eq!(
            LinkPacket::decode(&[0x55, 0xAA, 0x00]),
            Err(FormatError::BadHeader(0x55AA))
        );
        assert_eq!(
            LinkPacket::decode(&[0xAA, 0x55, 0x42]),
            Err(FormatError::UnknownKind(0x42))
        );
        // The framing itself is fine, only the kind is unknown.
        assert_eq!(LinkPacket::raw_kind(&[0xAA, 0x55, 0x42]), Ok(0x42));
        assert!(LinkPacket::raw_kind(&[0x55, 0xAA, 0x00]).is_err());
    }

    #[test]
    fn light_round_trip() {
        let packets = [
            LightPacket::node_info(),
            LightPacket::node_info_response(2, "living room"),
            LightPacket::light_info(7),
            LightPacket::light_info_response(7, 144, "shelf"),
            LightPacket::turn_on(1, 50),
            LightPacket::turn_off(1, 0),
            LightPacket::change_brightness(0, 10, -50),
            LightPacket::with_payload(LightKind::UpdateColor, 3, vec![0x07, 0, 0, 0, 1, 2, 3]),
        ];
        for packet in packets {
            assert_eq!(LightPacket::decode(&packet.encode()), Ok(packet));
        }
    }

    #[test]
    fn light_rejects_malformed() {
        assert_eq!(
            LightPacket::decode(&[0xAA, 0x00]),
            Err(FormatError::TooShort { len: 2, min: 3 })
        );
        assert_eq!(
            LightPacket::decode(&[0xAB, 0x00, 0x00]),
            Err(FormatError::BadHeader(0xAB))
        );
        assert_eq!(
            LightPacket::decode(&[0xAA, 0x00, 0x10]),
            Err(FormatError::UnknownKind(0x10))
        );
    }

    #[test]
    fn info_responses_carry_raw_names() {
        let response = LightPacket::light_info_response(4, 300, "desk");
        assert_eq!(
            response.encode(),
            vec![0xAA, 4, 0x81, 0x01, 0x2C, b'd', b'e', b's', b'k']
        );
    }
}
