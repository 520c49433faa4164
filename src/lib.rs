//! PWM output on the STM32L432 (Nucleo-L432KC): set a timer's carrier frequency,
//! then drive header pins with 16-bit duty cycles. Includes helpers for fading an
//! RGB LED.
//!
//! Supported timers are TIM1, TIM2, TIM15 and TIM16. Pins are addressed by their
//! Nucleo-32 header labels (`A0` - `A7`, `D0` - `D13`); each timer can drive the pins
//! wired to one of its channels, including complementary (`CHxN`) outputs.
//!
//! Drivers are written against `regs::RegisterBus`. Enable the `l4x2` feature for
//! `L4Registers`, which implements it over the hardware.
//!
//! ```ignore
//! let dp = pac::Peripherals::take().unwrap();
//! let regs = L4Registers::new(dp.RCC, dp.TIM1, dp.TIM2, dp.TIM15, dp.TIM16, dp.GPIOA,
//!     dp.GPIOB, dp.GPIOC);
//! let mut pwm = Pwm::new(regs, Clocks::default());
//!
//! pwm.configure_frequency(TimerPeriph::Tim1, 1_000)?;
//! pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 16_384)?; // 25%
//! ```

#![cfg_attr(not(test), no_std)]

use cfg_if::cfg_if;

cfg_if! {
    // L432 and L442 share this PAC.
    if #[cfg(feature = "l4x2")] {
        pub use stm32l4::stm32l4x2 as pac;

        mod hw;
        pub use hw::L4Registers;
    }
}

pub mod channel_map;
pub mod clocks;
pub mod error;
pub mod gpio;
pub mod pwm;
pub mod regs;
pub mod rgb;
pub mod timer;

#[cfg(test)]
mod mock;

pub use crate::{
    clocks::Clocks,
    error::{Error, Result},
    gpio::{AltFn, AltFnRouter, Pin},
    pwm::Pwm,
    timer::{TimerError, TimerPeriph},
};
