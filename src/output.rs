use std::sync::{Arc, Mutex};

use tracing::{trace, warn};

use crate::gamma::GammaCache;
use crate::light::Light;

/// Consumer of light state, typically a hardware driver.
///
/// Called from the node loop after every transition tick. Implementations
/// must return quickly.
pub trait LightOutput: Send + 'static {
    fn light_changed(&mut self, light_id: u8, light: &Light);
}

/// Traces every frame. Useful when no hardware is attached.
#[derive(Debug, Default)]
pub struct FrameLog;

impl LightOutput for FrameLog {
    fn light_changed(&mut self, light_id: u8, light: &Light) {
        trace!(
            light = light_id,
            name = light.name(),
            tick = light.tick(),
            "frame {:06x?}",
            light.colors().iter().map(|c| c.to_u32()).collect::<Vec<_>>()
        );
    }
}

/// 16 bit drive values for one led.
pub type Drive = [u16; 3];

#[derive(Debug, Default)]
struct Frames {
    gamma: GammaCache,
    lights: Vec<Vec<Drive>>,
}

/// Latest drive values of every light, shared with a hardware thread.
///
/// The node loop writes through `LightOutput`; readers on other threads use
/// `frame`, which takes the same lock.
#[derive(Clone, Debug, Default)]
pub struct SharedFrames {
    inner: Arc<Mutex<Frames>>,
}

impl SharedFrames {
    pub fn new() -> SharedFrames {
        SharedFrames::default()
    }

    pub fn frame(&self, light_id: u8) -> Option<Vec<Drive>> {
        let frames = self.inner.lock().ok()?;
        frames.lights.get(light_id as usize).cloned()
    }
}

impl LightOutput for SharedFrames {
    fn light_changed(&mut self, light_id: u8, light: &Light) {
        let mut frames = match self.inner.lock() {
            Ok(frames) => frames,
            Err(e) => {
                warn!("shared frames are poisoned: {}", e);
                return;
            }
        };
        let colors = light.colors();
        let drive: Vec<Drive> = match light.gamma() {
            Some(gamma) => {
                let table = frames.gamma.get(gamma);
                colors
                    .iter()
                    .map(|c| [table.get(c.r), table.get(c.g), table.get(c.b)])
                    .collect()
            }
            None => colors
                .iter()
                .map(|c| [c.r as u16 * 257, c.g as u16 * 257, c.b as u16 * 257])
                .collect(),
        };

        let index = light_id as usize;
        if frames.lights.len() <= index {
            frames.lights.resize(index + 1, Vec::new());
        }
        frames.lights[index] = drive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Hsv;
    use crate::layout::Layout;
    use std::time::Duration;
    use tokio::time::Instant;

    fn lit(gamma: Option<f32>) -> Light {
        let mut light = Light::new("test", Layout::strip(2), Duration::from_millis(1))
            .unwrap()
            .with_gamma(gamma);
        light.turn_on();
        light.set_all(Hsv::new(0, 0, 128));
        light.start_transition(Instant::now());
        light.poll(Instant::now(), |_| ());
        light
    }

    #[test]
    fn shared_frames_without_gamma() {
        let mut frames = SharedFrames::new();
        assert_eq!(frames.frame(0), None);
        frames.light_changed(1, &lit(None));
        assert_eq!(frames.frame(0), Some(Vec::new()));
        assert_eq!(frames.frame(1), Some(vec![[128 * 257; 3]; 2]));
    }

    #[test]
    fn shared_frames_apply_gamma() {
        let mut frames = SharedFrames::new();
        let reader = frames.clone();
        frames.light_changed(0, &lit(Some(2.2)));
        let drive = reader.frame(0).unwrap();
        assert!(drive[0][0] < 128 * 257);
        assert_eq!(drive[0], drive[1]);
    }
}
