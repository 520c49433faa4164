//! Colour mixing on an RGB LED wired to three PWM channels of one timer, and a
//! couple of canned fade sequences.
//!
//! Sequences are plain iterators; pacing them is up to the caller, eg:
//!
//! ```ignore
//! for colour in rgb::rainbow(10) {
//!     led.set(&mut pwm, colour)?;
//! }
//! ```

use crate::{
    error::Result,
    gpio::{AltFnRouter, Pin},
    pwm::{MAX_DUTY, Pwm},
    regs::RegisterBus,
    timer::TimerPeriph,
};

/// Brightness per colour; 0 is off, `MAX_DUTY` is full.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(MAX_DUTY, 0, 0);
    pub const GREEN: Self = Self::new(0, MAX_DUTY, 0);
    pub const BLUE: Self = Self::new(0, 0, MAX_DUTY);
    pub const WHITE: Self = Self::new(MAX_DUTY, MAX_DUTY, MAX_DUTY);

    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wiring {
    /// The LED's shared leg is on the supply, so a pin sinks current: the LED is
    /// brightest when the output is low.
    CommonAnode,
    /// The shared leg is on ground; the LED is lit while the output is high.
    CommonCathode,
}

impl Wiring {
    /// The duty cycle that gives `level` brightness.
    pub fn duty(self, level: u16) -> u16 {
        match self {
            Self::CommonAnode => MAX_DUTY - level,
            Self::CommonCathode => level,
        }
    }
}

/// An RGB LED with each colour on a channel of `timer`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgbLed {
    pub timer: TimerPeriph,
    pub red: Pin,
    pub green: Pin,
    pub blue: Pin,
    pub wiring: Wiring,
}

impl RgbLed {
    /// Show `colour`. Configure the timer's frequency first.
    pub fn set<B: RegisterBus + AltFnRouter>(&self, pwm: &mut Pwm<B>, colour: Rgb) -> Result<()> {
        pwm.set_channel_duty(self.timer, self.red, self.wiring.duty(colour.red))?;
        pwm.set_channel_duty(self.timer, self.green, self.wiring.duty(colour.green))?;
        pwm.set_channel_duty(self.timer, self.blue, self.wiring.duty(colour.blue))
    }

    pub fn off<B: RegisterBus + AltFnRouter>(&self, pwm: &mut Pwm<B>) -> Result<()> {
        self.set(pwm, Rgb::OFF)
    }
}

/// Levels from 0 up to full, every `step`.
fn rising(step: usize) -> impl Iterator<Item = u16> + Clone {
    (0..=MAX_DUTY).step_by(step.max(1))
}

/// Levels from full down towards 0, every `step`. Stops above 0.
fn falling(step: usize) -> impl Iterator<Item = u16> + Clone {
    (1..=MAX_DUTY).rev().step_by(step.max(1))
}

/// One breath, as duty values: fade from full down to 1, then from 0 back up to full,
/// one count at a time.
pub fn breathing() -> impl Iterator<Item = u16> + Clone {
    (1..=MAX_DUTY).rev().chain(0..=MAX_DUTY)
}

/// One trip around the colour wheel, with levels changing by `step` (at least 1) per
/// item: red, orange, green, cyan, blue, purple, and back towards red.
pub fn rainbow(step: usize) -> impl Iterator<Item = Rgb> + Clone {
    const FULL: u16 = MAX_DUTY;

    // Red -> orange -> yellow
    let legs = rising(step).map(|g| Rgb::new(FULL, g, 0));
    // -> green
    let legs = legs.chain(rising(step).map(|r| Rgb::new(FULL - r, FULL, 0)));
    // -> cyan
    let legs = legs.chain(rising(step).map(|b| Rgb::new(0, FULL, b)));
    // -> blue
    let legs = legs.chain(falling(step).map(|g| Rgb::new(0, g, FULL)));
    // -> purple
    let legs = legs.chain(rising(step).map(|r| Rgb::new(r, 0, FULL)));
    // -> red
    legs.chain(falling(step).map(|b| Rgb::new(FULL, 0, b)))
}
