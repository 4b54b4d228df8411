use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::Layout;
use crate::light::{Light, MAX_LEDS};
use crate::packet::NodeType;
use crate::session::SessionConfig;

pub const DEFAULT_SESSION_PORT: u16 = 54923;
pub const DEFAULT_REPLY_PORT: u16 = 54924;
pub const DEFAULT_COMMAND_PORT: u16 = 5492;

/// Light ids are a single byte, and so is the light count in node info.
pub const MAX_LIGHTS: usize = 255;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub name: String,
    pub layout: Layout,
    /// Brightness correction applied before hardware output.
    #[serde(default)]
    pub gamma: Option<f32>,
}

/// Everything needed to start a node, usually read from a json file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub name: String,
    #[serde(default)]
    pub node_type: Option<NodeType>,
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_session_port")]
    pub session_port: u16,
    #[serde(default = "default_reply_port")]
    pub reply_port: u16,
    #[serde(default = "default_command_port")]
    pub command_port: u16,
    #[serde(default = "default_alive_interval_ms")]
    pub alive_interval_ms: u64,
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,
    #[serde(default = "default_tick_interval_us")]
    pub tick_interval_us: u64,
    pub lights: Vec<LightConfig>,
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_session_port() -> u16 {
    DEFAULT_SESSION_PORT
}

fn default_reply_port() -> u16 {
    DEFAULT_REPLY_PORT
}

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

fn default_alive_interval_ms() -> u64 {
    1000
}

fn default_watchdog_timeout_ms() -> u64 {
    3000
}

fn default_tick_interval_us() -> u64 {
    1000
}

impl NodeConfig {
    /// A config with default ports and timings for the given lights.
    pub fn new(name: &str, lights: Vec<LightConfig>) -> NodeConfig {
        return NodeConfig {
            name: name.to_string(),
            node_type: None,
            bind: default_bind(),
            session_port: DEFAULT_SESSION_PORT,
            reply_port: DEFAULT_REPLY_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            alive_interval_ms: default_alive_interval_ms(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
            tick_interval_us: default_tick_interval_us(),
            lights,
        };
    }

    pub fn load(path: &Path) -> anyhow::Result<NodeConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: NodeConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        return Ok(config);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lights.is_empty() {
            return Err(ConfigError::NoLights);
        }
        if self.lights.len() > MAX_LIGHTS {
            return Err(ConfigError::TooManyLights(self.lights.len()));
        }
        for light in &self.lights {
            let count = light.layout.led_count();
            if count == 0 || count > MAX_LEDS {
                return Err(ConfigError::LedCount {
                    name: light.name.clone(),
                    count,
                });
            }
            if let Some(gamma) = light.gamma {
                if !gamma.is_finite() || gamma <= 0.0 {
                    return Err(ConfigError::InvalidGamma {
                        name: light.name.clone(),
                        gamma,
                    });
                }
            }
        }
        if self.alive_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("alive_interval_ms"));
        }
        if self.watchdog_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("watchdog_timeout_ms"));
        }
        if self.tick_interval_us == 0 {
            return Err(ConfigError::ZeroDuration("tick_interval_us"));
        }
        return Ok(());
    }

    pub fn node_type(&self) -> NodeType {
        match self.node_type {
            Some(node_type) => node_type,
            None if self.lights.iter().any(|l| l.layout.is_matrix()) => NodeType::Matrix,
            None => NodeType::Digital,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.lights.iter().map(|l| l.layout.led_count()).sum()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }

    pub fn session_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.session_port)
    }

    pub fn command_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.command_port)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            node_type: self.node_type(),
            pixel_count: self.pixel_count().min(u16::MAX as usize) as u16,
            reply_port: self.reply_port,
            alive_interval: Duration::from_millis(self.alive_interval_ms),
            watchdog_timeout: Duration::from_millis(self.watchdog_timeout_ms),
        }
    }

    pub fn build_lights(&self) -> Result<Vec<Light>, ConfigError> {
        self.lights
            .iter()
            .map(|l| Ok(Light::new(&l.name, l.layout, self.tick_interval())?.with_gamma(l.gamma)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(name: &str, leds: u8) -> LightConfig {
        LightConfig {
            name: name.to_string(),
            layout: Layout::strip(leds),
            gamma: None,
        }
    }

    #[test]
    fn parses_with_defaults() {
        let config: NodeConfig = serde_json::from_str(
            r#"{
                "name": "hallway",
                "lights": [
                    {"name": "ceiling", "layout": {"strip": {"leds": 60}}, "gamma": 2.2},
                    {"name": "panel", "layout": {"matrix": {"width": 8, "height": 8, "serpentine": true}}}
                ]
            }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.session_port, DEFAULT_SESSION_PORT);
        assert_eq!(config.reply_port, DEFAULT_REPLY_PORT);
        assert_eq!(config.command_port, DEFAULT_COMMAND_PORT);
        assert_eq!(config.node_type(), NodeType::Matrix);
        assert_eq!(config.pixel_count(), 124);
        assert_eq!(config.session().watchdog_timeout, Duration::from_secs(3));
        assert_eq!(config.tick_interval(), Duration::from_millis(1));

        let lights = config.build_lights().unwrap();
        assert_eq!(lights[0].gamma(), Some(2.2));
        assert_eq!(lights[1].len(), 64);
    }

    #[test]
    fn rejects_zero_lights() {
        let config = NodeConfig::new("empty", Vec::new());
        assert_eq!(config.validate(), Err(ConfigError::NoLights));
    }

    #[test]
    fn rejects_bad_lights() {
        let config = NodeConfig::new("n", vec![strip("dark", 0)]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LedCount { count: 0, .. })
        ));

        let big = LightConfig {
            name: "big".to_string(),
            layout: Layout::matrix(16, 16),
            gamma: None,
        };
        let config = NodeConfig::new("n", vec![big]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LedCount { count: 256, .. })
        ));

        let mut bad_gamma = strip("g", 3);
        bad_gamma.gamma = Some(-1.0);
        let config = NodeConfig::new("n", vec![bad_gamma]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGamma { .. })
        ));
    }

    #[test]
    fn rejects_zero_timings() {
        let mut config = NodeConfig::new("n", vec![strip("a", 1)]);
        config.tick_interval_us = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("tick_interval_us"))
        );
    }

    #[test]
    fn strip_only_nodes_are_digital() {
        let config = NodeConfig::new("n", vec![strip("a", 1), strip("b", 2)]);
        assert_eq!(config.node_type(), NodeType::Digital);
        assert_eq!(config.session().pixel_count, 3);
    }
}
