use crate::color::{Hsv, Rgb};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedState {
    pub h: u8,
    pub s: u8,
    pub v: u8,
    pub on: bool,
}

impl LedState {
    /// The value this state is driven towards: an led that is off fades to 0.
    pub fn effective_v(&self) -> u8 {
        if self.on {
            self.v
        } else {
            0
        }
    }

    pub fn hsv(&self) -> Hsv {
        Hsv::new(self.h, self.s, self.v)
    }
}

/// Interpolation progress of the three channels, each in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Progress {
    pub hue: f32,
    pub sat: f32,
    pub val: f32,
}

impl Progress {
    pub const DONE: Progress = Progress {
        hue: 1.0,
        sat: 1.0,
        val: 1.0,
    };

    pub fn min(&self) -> f32 {
        self.hue.min(self.sat).min(self.val)
    }
}

/// A single pixel.
///
/// `current` always lies between `start` and `target`, and moves along that
/// path as `update` is called with increasing progress.
#[derive(Clone, Debug, Default)]
pub struct Led {
    current: LedState,
    target: LedState,
    start: LedState,
}

impl Led {
    pub fn new() -> Led {
        Led::default()
    }

    pub fn current(&self) -> LedState {
        self.current
    }

    pub fn target(&self) -> LedState {
        self.target
    }

    pub fn rgb(&self) -> Rgb {
        self.current.hsv().to_rgb()
    }

    pub fn is_on(&self) -> bool {
        self.target.on
    }

    pub fn turn_on(&mut self) {
        self.target.on = true;
    }

    pub fn turn_off(&mut self) {
        self.target.on = false;
    }

    pub fn set_hue(&mut self, hue: u8) {
        self.target.h = hue;
    }

    pub fn set_sat(&mut self, sat: u8) {
        self.target.s = sat;
    }

    pub fn set_val(&mut self, val: u8) {
        self.target.v = val;
    }

    pub fn set_hsv(&mut self, hsv: Hsv) {
        self.set_hue(hsv.h);
        self.set_sat(hsv.s);
        self.set_val(hsv.v);
    }

    /// Begin a new transition from wherever the led currently is.
    pub fn start_transition(&mut self) {
        self.start = self.current;
    }

    pub fn update(&mut self, progress: Progress) {
        self.current.h = lerp_hue(self.start.h, self.target.h, progress.hue);
        self.current.s = lerp(self.start.s, self.target.s, progress.sat);
        self.current.v = lerp(self.start.v, self.target.effective_v(), progress.val);
        self.current.on = self.target.on || self.current.v > 0;
    }
}

fn lerp(start: u8, target: u8, t: f32) -> u8 {
    let delta = target as f32 - start as f32;
    let value = start as f32 + (delta * t).round();
    return value.clamp(0.0, 255.0) as u8;
}

/// Interpolates along the shorter arc of the hue wheel.
fn lerp_hue(start: u8, target: u8, t: f32) -> u8 {
    let mut delta = target as i16 - start as i16;
    if delta > 127 {
        delta -= 256;
    } else if delta < -128 {
        delta += 256;
    }
    let step = (delta as f32 * t).round() as i16;
    return (start as i16 + step).rem_euclid(256) as u8;
}
