use std::time::Duration;

use tokio::time::Instant;

use crate::color::{Hsv, Rgb};
use crate::error::ConfigError;
use crate::layout::{Coord, Layout};
use crate::led::{Led, Progress};
use crate::timer::{Fire, Timer};

/// The maximum number of leds a single light can hold.
pub const MAX_LEDS: usize = 255;

/// Transition length of each channel, in ticks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Periods {
    pub hue: u32,
    pub sat: u32,
    pub val: u32,
}

impl Periods {
    pub fn max(&self) -> u32 {
        self.hue.max(self.sat).max(self.val)
    }

    pub fn progress(&self, tick: u32) -> Progress {
        Progress {
            hue: channel_progress(tick, self.hue),
            sat: channel_progress(tick, self.sat),
            val: channel_progress(tick, self.val),
        }
    }
}

fn channel_progress(tick: u32, period: u32) -> f32 {
    if period == 0 {
        return 1.0;
    }
    return (tick as f32 / period as f32).min(1.0);
}

/// Converts a period from the wire (hundredths of a second) to ticks.
pub fn period_ticks(hundredths: u8) -> u32 {
    hundredths as u32 * 10
}

/// An ordered set of leds that transition together.
#[derive(Debug)]
pub struct Light {
    name: String,
    layout: Layout,
    leds: Vec<Led>,
    gamma: Option<f32>,

    periods: Periods,
    tick: u32,
    tick_interval: Duration,
    scheduler: Timer,
}

impl Light {
    /// Fails if the layout holds no leds or more than `MAX_LEDS`, so every
    /// address the layout produces has an led behind it.
    pub fn new(name: &str, layout: Layout, tick_interval: Duration) -> Result<Light, ConfigError> {
        let count = layout.led_count();
        if count == 0 || count > MAX_LEDS {
            return Err(ConfigError::LedCount {
                name: name.to_string(),
                count,
            });
        }
        return Ok(Light {
            name: name.to_string(),
            layout,
            leds: vec![Led::new(); count],
            gamma: None,
            periods: Periods::default(),
            tick: 0,
            tick_interval,
            scheduler: Timer::new(),
        });
    }

    pub fn with_gamma(mut self, gamma: Option<f32>) -> Light {
        self.gamma = gamma;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.leds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    pub fn gamma(&self) -> Option<f32> {
        self.gamma
    }

    pub fn leds(&self) -> &[Led] {
        &self.leds
    }

    pub fn leds_mut(&mut self) -> &mut [Led] {
        &mut self.leds
    }

    pub fn led_at(&self, coord: Coord) -> Option<&Led> {
        self.layout.index(coord).and_then(|i| self.leds.get(i))
    }

    pub fn led_at_mut(&mut self, coord: Coord) -> Option<&mut Led> {
        let index = self.layout.index(coord)?;
        self.leds.get_mut(index)
    }

    pub fn colors(&self) -> Vec<Rgb> {
        self.leds.iter().map(Led::rgb).collect()
    }

    pub fn periods(&self) -> Periods {
        self.periods
    }

    pub fn set_periods(&mut self, periods: Periods) {
        self.periods = periods;
    }

    pub fn set_hue_period(&mut self, ticks: u32) {
        self.periods.hue = ticks;
    }

    pub fn set_sat_period(&mut self, ticks: u32) {
        self.periods.sat = ticks;
    }

    pub fn set_val_period(&mut self, ticks: u32) {
        self.periods.val = ticks;
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn is_transitioning(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn turn_on(&mut self) {
        self.leds.iter_mut().for_each(Led::turn_on);
    }

    pub fn turn_off(&mut self) {
        self.leds.iter_mut().for_each(Led::turn_off);
    }

    pub fn set_all(&mut self, hsv: Hsv) {
        for led in &mut self.leds {
            led.set_hsv(hsv);
        }
    }

    /// Snapshots every led and (re)starts the scheduler. The first tick runs
    /// at `now`.
    pub fn start_transition(&mut self, now: Instant) {
        for led in &mut self.leds {
            led.start_transition();
        }
        self.tick = 0;
        if self.scheduler.is_idle() {
            self.scheduler.schedule(now);
        }
    }

    /// Runs every tick that is due at `now`.
    ///
    /// Returns the number of ticks that ran; `on_tick` is invoked after each
    /// of them so the hardware sees every intermediate frame.
    pub fn poll(&mut self, now: Instant, mut on_tick: impl FnMut(&Light)) -> usize {
        let mut ticks = 0;
        while let Some(token) = self.scheduler.due(now) {
            let deadline = match self.scheduler.deadline() {
                Some(deadline) => deadline,
                None => break,
            };
            if self.scheduler.fire(token) == Fire::Cancelled {
                break;
            }

            let done = self.step();
            ticks += 1;
            on_tick(self);

            if done {
                self.scheduler.finish();
            } else {
                self.scheduler.schedule(deadline + self.tick_interval);
            }
        }
        return ticks;
    }

    /// Stops the scheduler and leaves every led where it currently is.
    pub fn stop(&mut self) {
        self.scheduler.cancel();
    }

    /// Advances all leds by one tick. Returns true once every channel has
    /// settled.
    fn step(&mut self) -> bool {
        let progress = self.periods.progress(self.tick);
        self.tick = (self.tick + 1).min(self.periods.max());
        for led in &mut self.leds {
            led.update(progress);
        }
        return progress.min() >= 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(1);

    fn strip(leds: u8) -> Light {
        Light::new("test", Layout::strip(leds), TICK).unwrap()
    }

    #[test]
    fn new_light_is_idle_and_dark() {
        let light = strip(3);
        assert_eq!(light.len(), 3);
        assert!(!light.is_transitioning());
        assert_eq!(light.colors(), vec![Rgb::BLACK; 3]);
    }

    #[test]
    fn instant_transition_settles_in_one_tick() {
        let now = Instant::now();
        let mut light = strip(2);
        light.turn_on();
        light.set_all(Hsv::new(0, 255, 200));
        light.start_transition(now);
        assert_eq!(light.next_deadline(), Some(now));

        let mut frames = 0;
        assert_eq!(light.poll(now, |_| frames += 1), 1);
        assert_eq!(frames, 1);
        assert!(!light.is_transitioning());
        for led in light.leds() {
            assert_eq!(led.current(), led.target());
        }
    }

    #[test]
    fn timed_transition_follows_the_clock() {
        let now = Instant::now();
        let mut light = strip(1);
        light.turn_on();
        light.set_all(Hsv::new(0, 0, 100));
        light.set_val_period(100);
        light.start_transition(now);

        // Ticks 0..=50 are due after 50ms.
        light.poll(now + Duration::from_millis(50), |_| ());
        assert_eq!(light.leds()[0].current().v, 50);
        assert!(light.is_transitioning());

        light.poll(now + Duration::from_millis(99), |_| ());
        assert_eq!(light.leds()[0].current().v, 99);
        assert!(light.is_transitioning());

        light.poll(now + Duration::from_millis(100), |_| ());
        assert_eq!(light.leds()[0].current().v, 100);
        assert!(!light.is_transitioning());
        assert_eq!(light.tick(), 100);
    }

    #[test]
    fn scheduler_stops_after_the_longest_channel() {
        let now = Instant::now();
        let mut light = strip(1);
        light.turn_on();
        light.set_all(Hsv::new(100, 100, 100));
        light.set_periods(Periods {
            hue: 10,
            sat: 0,
            val: 20,
        });
        light.start_transition(now);

        let ticks = light.poll(now + Duration::from_secs(1), |_| ());
        assert_eq!(ticks, 21);
        assert!(!light.is_transitioning());
        assert_eq!(light.next_deadline(), None);
        // Nothing more to do once settled.
        assert_eq!(light.poll(now + Duration::from_secs(2), |_| ()), 0);
    }

    #[test]
    fn restart_resets_progress() {
        let now = Instant::now();
        let mut light = strip(1);
        light.turn_on();
        light.set_all(Hsv::new(0, 0, 200));
        light.set_val_period(10);
        light.start_transition(now);
        light.poll(now + Duration::from_millis(5), |_| ());
        assert_eq!(light.leds()[0].current().v, 100);

        light.set_all(Hsv::new(0, 0, 0));
        light.start_transition(now + Duration::from_millis(5));
        assert_eq!(light.tick(), 0);
        light.poll(now + Duration::from_millis(100), |_| ());
        assert_eq!(light.leds()[0].current().v, 0);
    }

    #[test]
    fn stop_freezes_leds() {
        let now = Instant::now();
        let mut light = strip(1);
        light.turn_on();
        light.set_all(Hsv::new(0, 0, 200));
        light.set_val_period(10);
        light.start_transition(now);
        light.poll(now + Duration::from_millis(5), |_| ());
        light.stop();
        assert_eq!(light.poll(now + Duration::from_secs(1), |_| ()), 0);
        assert_eq!(light.leds()[0].current().v, 100);
    }

    #[test]
    fn matrix_coordinates() {
        let mut light = Light::new("panel", Layout::matrix(3, 2), TICK).unwrap();
        assert_eq!(light.len(), 6);
        light.led_at_mut(Coord::new(2, 1)).unwrap().set_val(42);
        assert_eq!(light.leds()[5].target().v, 42);
        assert!(light.led_at(Coord::new(3, 0)).is_none());
    }

    #[test]
    fn oversized_or_empty_layouts_are_rejected() {
        assert_eq!(
            Light::new("big", Layout::matrix(16, 16), TICK).err(),
            Some(ConfigError::LedCount {
                name: "big".to_string(),
                count: 256,
            })
        );
        assert!(Light::new("none", Layout::strip(0), TICK).is_err());
        assert_eq!(Light::new("full", Layout::matrix(15, 17), TICK).unwrap().len(), 255);
    }

    #[test]
    fn period_scaling() {
        assert_eq!(period_ticks(0), 0);
        assert_eq!(period_ticks(25), 250);
    }
}
