use thiserror::Error;

/// A datagram that could not be framed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("datagram too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("incorrect header 0x{0:04x}")]
    BadHeader(u16),

    #[error("unknown packet kind 0x{0:02x}")]
    UnknownKind(u8),
}

/// A well-framed command that cannot be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid light id {0}")]
    UnknownLight(u8),

    #[error("{kind} expects {expected} payload bytes, got {actual}")]
    PayloadLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("empty channel mask")]
    EmptyChannelMask,

    #[error("invalid channel mask 0x{0:02x}")]
    InvalidChannelMask(u8),

    #[error("color update of {actual} bytes fits neither {broadcast} (broadcast) nor {per_pixel} (per pixel)")]
    ColorLength {
        actual: usize,
        broadcast: usize,
        per_pixel: usize,
    },

    #[error("brightness delta {0}% out of range")]
    BrightnessOutOfRange(i8),

    #[error("frame of {actual} pixels does not match {expected} leds")]
    FrameSize { expected: usize, actual: usize },

    #[error("{0} is a reply and cannot be handled by a node")]
    NotACommand(&'static str),
}

/// Rejected node configuration. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("a node requires at least 1 light (got 0)")]
    NoLights,

    #[error("a node supports at most 255 lights (got {0})")]
    TooManyLights(usize),

    #[error("light '{name}' has {count} leds, expected 1..=255")]
    LedCount { name: String, count: usize },

    #[error("light '{name}' has invalid gamma {gamma}")]
    InvalidGamma { name: String, gamma: f32 },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
