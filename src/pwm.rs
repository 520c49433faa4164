//! PWM output on header pins. `Pwm` owns the register bus; set a timer's carrier
//! frequency with `configure_frequency`, then drive pins with `set_channel_duty`.
//!
//! ```ignore
//! let mut pwm = Pwm::new(L4Registers::new(dp.RCC, dp.TIM1, dp.TIM2, dp.TIM15, dp.TIM16,
//!     dp.GPIOA, dp.GPIOB, dp.GPIOC), Clocks::default());
//!
//! pwm.configure_frequency(TimerPeriph::Tim1, 1_000)?;
//! pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 32_768)?; // ~50%
//! ```
//!
//! Duty is on a 0 - 65_535 scale, relative to whatever period the timer was last
//! configured with. Configure the timer's frequency before setting duty on its pins;
//! otherwise the compare value is scaled by whatever `ARR` holds. Out of reset that's
//! `0xFFFF`, so the duty lands in `CCRx` nearly unscaled.

#[cfg(feature = "defmt")]
use defmt::{debug, trace};

use crate::{
    channel_map::{self, ChannelBinding},
    clocks::Clocks,
    error::Result,
    gpio::{AltFnRouter, Pin},
    regs::{
        CCMR_OCM_3, CCMR_OCM_MASK, CCMR_OCM_POS, CCMR_OCM_PWM1, CCMR_OCPE, Reg, RegisterBus,
        TimReg,
    },
    timer::{self, PwmTimer, TimerPeriph, TimerState},
};

/// Full scale of the duty argument.
pub const MAX_DUTY: u16 = u16::MAX;

/// Scale a 16-bit duty to a compare value for a timer with auto-reload `reload`.
/// Truncates; 0 maps to 0, and `MAX_DUTY` maps to `reload`.
pub fn compare_value(duty: u16, reload: u16) -> u16 {
    (duty as u32 * reload as u32 / MAX_DUTY as u32) as u16
}

/// Set a channel to PWM mode 1 with its compare register preloaded, and enable its
/// output (`CCxE`, or `CCxNE` for a complementary output). Only this channel's bits
/// change.
pub fn enable_pwm_channel<B: RegisterBus + ?Sized>(bus: &mut B, binding: &ChannelBinding) {
    let tim = binding.timer;
    let shift = binding.channel.ccmr_shift();
    let mode_mask = (CCMR_OCM_MASK | CCMR_OCM_3) << shift;

    // Preload: CCRx writes take effect at the next update event, so a duty change never
    // lands mid-period.
    bus.modify(Reg::Tim(tim, binding.channel.ccmr()), |v| {
        let mode = (CCMR_OCM_PWM1 << CCMR_OCM_POS) | CCMR_OCPE;
        (v & !mode_mask) | (mode << shift)
    });

    bus.set_bits(Reg::Tim(tim, TimReg::Ccer), binding.code().ccer_bit());
}

/// PWM driver for the L432's TIM1, TIM2, TIM15 and TIM16.
pub struct Pwm<B> {
    bus: B,
    clocks: Clocks,
    /// The timer each pin is currently routed to, if any.
    owners: [Option<PwmTimer>; Pin::COUNT],
}

impl<B: RegisterBus + AltFnRouter> Pwm<B> {
    pub fn new(bus: B, clocks: Clocks) -> Self {
        Self {
            bus,
            clocks,
            owners: [None; Pin::COUNT],
        }
    }

    /// Set a timer's PWM carrier frequency, in Hz, and start its counter. See
    /// `timer::configure_frequency`.
    pub fn configure_frequency(&mut self, timer: TimerPeriph, freq: u32) -> Result<()> {
        timer::configure_frequency(&mut self.bus, &self.clocks, timer, freq)?;
        Ok(())
    }

    /// Output PWM on `pin` from `timer`, with `duty` out of `MAX_DUTY`.
    ///
    /// The first call for a given pin and timer sets the channel's output mode, enables
    /// its output and routes the pin to the timer. After that, only the compare register
    /// is written, until the pin is driven from a different timer.
    pub fn set_channel_duty(&mut self, timer: TimerPeriph, pin: Pin, duty: u16) -> Result<()> {
        let binding = channel_map::resolve(timer, pin)?;
        let tim = binding.timer;

        let reload = self.bus.read(Reg::Tim(tim, TimReg::Arr)) as u16;
        let compare = compare_value(duty, reload);

        // Complementary outputs share CCRx with their primary.
        self.bus.write(Reg::Tim(tim, binding.channel.ccr()), compare as u32);

        #[cfg(feature = "defmt")]
        trace!("{} {}: CCR {} / {}", tim, pin, compare, reload);

        if self.is_bound(tim, pin) {
            return Ok(());
        }

        enable_pwm_channel(&mut self.bus, &binding);
        self.bus.bind_alternate_function(pin, tim.alt_fn())?;

        self.owners[pin.index()] = Some(tim);

        #[cfg(feature = "defmt")]
        debug!(
            "{} bound to {} {} (complementary: {})",
            pin, tim, binding.channel, binding.complementary
        );

        Ok(())
    }

    /// Read a timer's current prescaler, reload value and enable state.
    pub fn timer_state(&self, timer: TimerPeriph) -> Result<TimerState> {
        timer::timer_state(&self.bus, timer)
    }

    /// Read the compare value currently driving `pin`.
    pub fn compare(&self, timer: TimerPeriph, pin: Pin) -> Result<u16> {
        let binding = channel_map::resolve(timer, pin)?;

        Ok(self.bus.read(Reg::Tim(binding.timer, binding.channel.ccr())) as u16)
    }

    pub fn clocks(&self) -> &Clocks {
        &self.clocks
    }

    /// Release the register bus.
    pub fn free(self) -> B {
        self.bus
    }

    fn is_bound(&self, tim: PwmTimer, pin: Pin) -> bool {
        self.owners[pin.index()] == Some(tim)
    }
}

#[cfg(feature = "embedded_hal")]
mod embedded_hal_impl {
    use embedded_hal::pwm::{ErrorType, SetDutyCycle};

    use super::{MAX_DUTY, Pwm};
    use crate::{
        channel_map,
        error::{Error, Result},
        gpio::{AltFnRouter, Pin},
        regs::RegisterBus,
        timer::TimerPeriph,
    };

    /// A single pin's PWM output, borrowed from a `Pwm`.
    pub struct PwmPin<'a, B> {
        pwm: &'a mut Pwm<B>,
        timer: TimerPeriph,
        pin: Pin,
    }

    impl<B: RegisterBus + AltFnRouter> Pwm<B> {
        /// Borrow a pin's output as an `embedded-hal` PWM pin. Fails if the pin isn't
        /// wired to the timer.
        pub fn pin(&mut self, timer: TimerPeriph, pin: Pin) -> Result<PwmPin<'_, B>> {
            channel_map::resolve(timer, pin)?;
            Ok(PwmPin {
                pwm: self,
                timer,
                pin,
            })
        }
    }

    impl<B> ErrorType for PwmPin<'_, B> {
        type Error = Error;
    }

    impl<B: RegisterBus + AltFnRouter> SetDutyCycle for PwmPin<'_, B> {
        fn max_duty_cycle(&self) -> u16 {
            MAX_DUTY
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<()> {
            self.pwm.set_channel_duty(self.timer, self.pin, duty)
        }
    }
}

#[cfg(feature = "embedded_hal")]
pub use embedded_hal_impl::PwmPin;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel_map::valid_pins,
        error::Error,
        gpio::AltFn,
        mock::RegisterFile,
        regs::{CR1_CEN, GpioReg},
        timer::TimerError,
    };

    fn pwm() -> Pwm<RegisterFile> {
        Pwm::new(RegisterFile::default(), Clocks::default())
    }

    fn reg(pwm: &Pwm<RegisterFile>, tim: PwmTimer, reg: TimReg) -> u32 {
        pwm.bus.get(Reg::Tim(tim, reg))
    }

    #[test]
    fn compare_value_endpoints() {
        assert_eq!(compare_value(0, 3_999), 0);
        assert_eq!(compare_value(MAX_DUTY, 3_999), 3_999);
        assert_eq!(compare_value(32_767, 3_999), 1_999);
        assert_eq!(compare_value(MAX_DUTY, 65_535), 65_535);
    }

    #[test]
    fn compare_value_is_monotonic() {
        for reload in [0, 1, 99, 3_999, 39_999, 65_535] {
            let mut prev = 0;
            for duty in 0..=MAX_DUTY {
                let compare = compare_value(duty, reload);
                assert!(compare >= prev);
                assert!(compare <= reload);
                prev = compare;
            }
        }
    }

    #[test]
    fn rgb_led_on_tim1_at_1khz() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim1, 1_000).unwrap();

        let state = pwm.timer_state(TimerPeriph::Tim1).unwrap();
        assert_eq!(state.prescaler, 0);
        assert_eq!(state.reload, 3_999);
        assert_eq!(state.freq(4_000_000), 1_000);

        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 32_767).unwrap();

        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccr1), 1_999);
        assert_eq!(pwm.compare(TimerPeriph::Tim1, Pin::D9), Ok(1_999));
        // OC1M = PWM mode 1, OC1PE set.
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccmr1), 0b0110_1000);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccer), 1);
        // PA8 on AF1.
        assert_eq!(pwm.bus.binds, [(Pin::D9, AltFn::Af1)]);
        assert_eq!(pwm.bus.get(Reg::Gpio(crate::gpio::Port::A, GpioReg::Afrh)), 1);
    }

    #[test]
    fn every_valid_pin_enables_exactly_its_output() {
        for tim in PwmTimer::ALL {
            for (pin, code) in valid_pins(tim) {
                let mut pwm = pwm();
                pwm.configure_frequency(tim.into(), 1_000).unwrap();
                pwm.set_channel_duty(tim.into(), pin, 10_000).unwrap();

                let ccer = reg(&pwm, tim, TimReg::Ccer);
                assert_eq!(ccer.count_ones(), 1, "{tim:?} {pin:?}");
                assert_eq!(ccer, code.ccer_bit(), "{tim:?} {pin:?}");
                assert_eq!(pwm.bus.binds, [(pin, tim.alt_fn())]);
            }
        }
    }

    #[test]
    fn complementary_output_uses_primary_ccr_and_n_enable() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim1, 1_000).unwrap();
        // D3 is TIM1_CH2N.
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D3, MAX_DUTY).unwrap();

        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccr2), 3_999);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccmr1), 0b0110_1000 << 8);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccer), 1 << 6);
    }

    #[test]
    fn channels_3_and_4_use_ccmr2() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim1, 1_000).unwrap();
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D0, 100).unwrap(); // CH3
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D10, 200).unwrap(); // CH4

        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccmr1), 0);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccmr2), 0x6868);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccer), (1 << 8) | (1 << 12));
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccr3), 6);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccr4), 12);
    }

    #[test]
    fn binding_leaves_other_channels_alone() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim1, 1_000).unwrap();
        // Channel 1 in some other mode, with the split-off OC1M[3] bit set.
        pwm.bus.set(Reg::Tim(PwmTimer::Tim1, TimReg::Ccmr1), 0x0001_0070);
        pwm.bus.set(Reg::Tim(PwmTimer::Tim1, TimReg::Ccer), 1);

        // D1 is TIM1_CH2.
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D1, 1_000).unwrap();

        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccmr1), 0x0001_6870);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccer), 0b1_0001);
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccr1), 0);

        // Rebinding channel 1 clears its whole mode field, including bit 16.
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 1_000).unwrap();
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Ccmr1), 0x6868);
    }

    #[test]
    fn invalid_pin_touches_nothing() {
        for tim in PwmTimer::ALL {
            let mut pwm = pwm();
            pwm.configure_frequency(tim.into(), 1_000).unwrap();
            let before = pwm.bus.snapshot();
            pwm.bus.clear_log();

            for pin in Pin::ALL {
                if valid_pins(tim).any(|(p, _)| p == pin) {
                    continue;
                }
                assert_eq!(
                    pwm.set_channel_duty(tim.into(), pin, 30_000),
                    Err(Error::TimerError(TimerError::InvalidChannel))
                );
            }

            assert_eq!(pwm.bus.write_count(), 0);
            assert!(pwm.bus.binds.is_empty());
            assert_eq!(pwm.bus.snapshot(), before);
        }
    }

    #[test]
    fn unsupported_timer_touches_nothing() {
        let mut pwm = pwm();
        for timer in [TimerPeriph::Tim6, TimerPeriph::Tim7, TimerPeriph::Lptim1] {
            assert_eq!(
                pwm.configure_frequency(timer, 1_000),
                Err(Error::TimerError(TimerError::UnsupportedTimer))
            );
            assert_eq!(
                pwm.set_channel_duty(timer, Pin::D9, 30_000),
                Err(Error::TimerError(TimerError::UnsupportedTimer))
            );
        }
        assert_eq!(pwm.bus.write_count(), 0);
    }

    #[test]
    fn duty_sweep_is_monotonic_and_hits_endpoints() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim2, 250).unwrap();
        let reload = pwm.timer_state(TimerPeriph::Tim2).unwrap().reload;
        assert_eq!(reload, 15_999);

        let mut prev = 0;
        for duty in (0..=MAX_DUTY).step_by(7) {
            pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A0, duty).unwrap();
            let compare = pwm.compare(TimerPeriph::Tim2, Pin::A0).unwrap();
            assert!(compare >= prev);
            prev = compare;
        }

        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A0, 0).unwrap();
        assert_eq!(pwm.compare(TimerPeriph::Tim2, Pin::A0), Ok(0));
        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A0, MAX_DUTY).unwrap();
        assert_eq!(pwm.compare(TimerPeriph::Tim2, Pin::A0), Ok(reload));
    }

    #[test]
    fn repeat_duty_only_writes_compare_register() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim16, 1_000).unwrap();
        pwm.set_channel_duty(TimerPeriph::Tim16, Pin::A5, 1_000).unwrap();
        pwm.bus.clear_log();

        pwm.set_channel_duty(TimerPeriph::Tim16, Pin::A5, 2_000).unwrap();

        assert_eq!(
            pwm.bus.writes(),
            [(Reg::Tim(PwmTimer::Tim16, TimReg::Ccr1), 122)]
        );
        assert!(pwm.bus.binds.is_empty());
    }

    #[test]
    fn cached_binding_matches_full_setup() {
        let mut cached = RegisterFile::default();
        {
            let mut pwm = Pwm::new(&mut cached, Clocks::default());
            pwm.configure_frequency(TimerPeriph::Tim15, 1_000).unwrap();
            pwm.set_channel_duty(TimerPeriph::Tim15, Pin::A2, 5_000).unwrap();
            pwm.set_channel_duty(TimerPeriph::Tim15, Pin::A2, 40_000).unwrap();
        }

        let mut uncached = RegisterFile::default();
        {
            let mut pwm = Pwm::new(&mut uncached, Clocks::default());
            pwm.configure_frequency(TimerPeriph::Tim15, 1_000).unwrap();
            pwm.set_channel_duty(TimerPeriph::Tim15, Pin::A2, 5_000).unwrap();
        }
        {
            // A fresh driver has no record of the binding, so does the full setup again.
            let mut pwm = Pwm::new(&mut uncached, Clocks::default());
            pwm.set_channel_duty(TimerPeriph::Tim15, Pin::A2, 40_000).unwrap();
        }

        assert_eq!(cached.snapshot(), uncached.snapshot());
    }

    #[test]
    fn two_pins_on_one_channel_are_both_routed() {
        // A0 (PA0) and A4 (PA5) are both TIM2_CH1.
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim2, 1_000).unwrap();
        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A0, 1_000).unwrap();
        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A4, 1_000).unwrap();

        assert_eq!(pwm.bus.binds, [(Pin::A0, AltFn::Af1), (Pin::A4, AltFn::Af1)]);
    }

    #[test]
    fn duty_before_frequency_uses_reset_reload() {
        let mut pwm = pwm();
        // `TIMx_ARR` reset value.
        pwm.bus.set(Reg::Tim(PwmTimer::Tim1, TimReg::Arr), 0xFFFF);
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 1_000).unwrap();

        assert_eq!(pwm.compare(TimerPeriph::Tim1, Pin::D9), Ok(1_000));
        assert_eq!(reg(&pwm, PwmTimer::Tim1, TimReg::Cr1) & CR1_CEN, 0);
    }

    #[test]
    fn pin_shared_between_timers_follows_latest() {
        // A1 (PA1) is TIM2_CH2 on AF1, and TIM15_CH1N on AF14.
        let afrl = Reg::Gpio(crate::gpio::Port::A, GpioReg::Afrl);
        let pa1_af = |pwm: &Pwm<RegisterFile>| (pwm.bus.get(afrl) >> 4) & 0b1111;

        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim2, 1_000).unwrap();
        pwm.configure_frequency(TimerPeriph::Tim15, 1_000).unwrap();

        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A1, 10_000).unwrap();
        assert_eq!(pa1_af(&pwm), 1);

        pwm.set_channel_duty(TimerPeriph::Tim15, Pin::A1, 20_000).unwrap();
        assert_eq!(pa1_af(&pwm), 14);

        pwm.bus.clear_log();
        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A1, 30_000).unwrap();
        assert_eq!(pa1_af(&pwm), 1);
        assert_eq!(pwm.bus.binds, [(Pin::A1, AltFn::Af1)]);

        // Back on TIM2, further updates only write the compare register again.
        pwm.bus.clear_log();
        pwm.set_channel_duty(TimerPeriph::Tim2, Pin::A1, 40_000).unwrap();
        assert_eq!(pwm.bus.write_count(), 1);
        assert_eq!(pa1_af(&pwm), 1);
    }

    #[test]
    fn reconfiguring_frequency_rescales_next_duty() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim1, 1_000).unwrap();
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 32_767).unwrap();
        assert_eq!(pwm.compare(TimerPeriph::Tim1, Pin::D9), Ok(1_999));

        pwm.configure_frequency(TimerPeriph::Tim1, 2_000).unwrap();
        // The compare register keeps its old value until the next duty update.
        assert_eq!(pwm.compare(TimerPeriph::Tim1, Pin::D9), Ok(1_999));
        pwm.set_channel_duty(TimerPeriph::Tim1, Pin::D9, 32_767).unwrap();
        assert_eq!(pwm.compare(TimerPeriph::Tim1, Pin::D9), Ok(999));
    }

    #[test]
    fn free_returns_the_bus() {
        let mut pwm = pwm();
        pwm.configure_frequency(TimerPeriph::Tim1, 1_000).unwrap();
        let regs = pwm.free();
        assert_eq!(regs.get(Reg::Tim(PwmTimer::Tim1, TimReg::Arr)), 3_999);
    }
}
