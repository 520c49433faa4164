//! Timer identities, and setting a timer's PWM carrier frequency: the clock gate,
//! prescaler (`PSC`) and auto-reload (`ARR`) values, main output enable, and
//! counter enable.
//!
//! Channel-level PWM setup is in `pwm`.

#[cfg(feature = "defmt")]
use defmt::debug;

use crate::{
    clocks::{ApbBus, Clocks},
    error::Result,
    gpio::AltFn,
    regs::{BDTR_MOE, CR1_CEN, ClockGate, EGR_UG, RccReg, Reg, RegisterBus, TimReg},
};

/// Largest value of the 16-bit `PSC` and `ARR` registers.
const MAX_16: u32 = 65_535;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerError {
    /// The timer isn't one that can output PWM here. (TIM1, TIM2, TIM15 and TIM16 can)
    UnsupportedTimer,
    /// The pin isn't wired to any channel of this timer.
    InvalidChannel,
    /// The frequency is 0, or faster than the timer clock.
    InvalidFrequency,
}

/// The timer peripherals on the STM32L432.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPeriph {
    /// Advanced-control timer.
    Tim1,
    /// General purpose timer. (32-bit counter)
    Tim2,
    /// Basic timer; no capture/compare channels.
    Tim6,
    /// Basic timer; no capture/compare channels.
    Tim7,
    /// General purpose timer, 2 channels.
    Tim15,
    /// General purpose timer, 1 channel.
    Tim16,
    /// Low-power timer.
    Lptim1,
    /// Low-power timer.
    Lptim2,
}

/// A timer we can run PWM on. Obtained from a `TimerPeriph` with `try_from`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PwmTimer {
    Tim1,
    Tim2,
    Tim15,
    Tim16,
}

impl TryFrom<TimerPeriph> for PwmTimer {
    type Error = TimerError;

    fn try_from(periph: TimerPeriph) -> core::result::Result<Self, Self::Error> {
        match periph {
            TimerPeriph::Tim1 => Ok(Self::Tim1),
            TimerPeriph::Tim2 => Ok(Self::Tim2),
            TimerPeriph::Tim15 => Ok(Self::Tim15),
            TimerPeriph::Tim16 => Ok(Self::Tim16),
            _ => Err(TimerError::UnsupportedTimer),
        }
    }
}

impl From<PwmTimer> for TimerPeriph {
    fn from(tim: PwmTimer) -> Self {
        match tim {
            PwmTimer::Tim1 => Self::Tim1,
            PwmTimer::Tim2 => Self::Tim2,
            PwmTimer::Tim15 => Self::Tim15,
            PwmTimer::Tim16 => Self::Tim16,
        }
    }
}

impl PwmTimer {
    pub const ALL: [Self; 4] = [Self::Tim1, Self::Tim2, Self::Tim15, Self::Tim16];

    /// Position in `ALL`; used to index per-timer state.
    pub fn index(self) -> usize {
        match self {
            Self::Tim1 => 0,
            Self::Tim2 => 1,
            Self::Tim15 => 2,
            Self::Tim16 => 3,
        }
    }

    /// RCC enable bit. `APB2ENR` for TIM1/15/16, `APB1ENR1` for TIM2.
    pub fn clock_gate(self) -> ClockGate {
        match self {
            Self::Tim1 => ClockGate::new(RccReg::Apb2enr, 11),
            Self::Tim2 => ClockGate::new(RccReg::Apb1enr1, 0),
            Self::Tim15 => ClockGate::new(RccReg::Apb2enr, 16),
            Self::Tim16 => ClockGate::new(RccReg::Apb2enr, 17),
        }
    }

    /// The APB bus the timer is clocked from.
    pub fn bus(self) -> ApbBus {
        match self {
            Self::Tim2 => ApbBus::Apb1,
            _ => ApbBus::Apb2,
        }
    }

    /// TIM2 has no break and dead-time register, so no main output enable.
    pub fn has_break(self) -> bool {
        !matches!(self, Self::Tim2)
    }

    /// Alternate function that connects this timer's channels to their pins.
    /// AF1 for TIM1 and TIM2; AF14 for TIM15 and TIM16. (DS11451, Table 15)
    pub fn alt_fn(self) -> AltFn {
        match self {
            Self::Tim1 | Self::Tim2 => AltFn::Af1,
            Self::Tim15 | Self::Tim16 => AltFn::Af14,
        }
    }
}

/// Timer channel
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimChannel {
    C1,
    C2,
    C3,
    C4,
}

impl TimChannel {
    /// From a zero-based index; `None` past 3.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::C1),
            1 => Some(Self::C2),
            2 => Some(Self::C3),
            3 => Some(Self::C4),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// The capture/compare register holding this channel's compare value.
    pub fn ccr(self) -> TimReg {
        match self {
            Self::C1 => TimReg::Ccr1,
            Self::C2 => TimReg::Ccr2,
            Self::C3 => TimReg::Ccr3,
            Self::C4 => TimReg::Ccr4,
        }
    }

    /// The capture/compare mode register holding this channel's settings. Channels 1 and 2
    /// share `CCMR1`; 3 and 4 share `CCMR2`.
    pub fn ccmr(self) -> TimReg {
        match self {
            Self::C1 | Self::C2 => TimReg::Ccmr1,
            Self::C3 | Self::C4 => TimReg::Ccmr2,
        }
    }

    /// Shift of this channel's fields within its `CCMRx` register.
    pub fn ccmr_shift(self) -> u32 {
        match self {
            Self::C1 | Self::C3 => 0,
            Self::C2 | Self::C4 => 8,
        }
    }
}

/// Frequency settings currently in a timer's registers.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerState {
    pub prescaler: u16,
    pub reload: u16,
    pub enabled: bool,
}

impl TimerState {
    /// The PWM frequency these settings produce, in Hz, given the timer's clock.
    pub fn freq(&self, clock_speed: u32) -> u32 {
        let ticks = (self.prescaler as u64 + 1) * (self.reload as u64 + 1);
        (clock_speed as u64 / ticks) as u32
    }
}

/// Calculate values required to set the timer frequency: `PSC` and `ARR`.
///
/// (PSC+1)*(ARR+1) = TIMclk/Updatefrequency
///
/// The prescaler is chosen as `clock / (freq * 65_536)`: the smallest value that keeps
/// ARR within 16 bits for any frequency that rounds to the same prescaler, rather than
/// the tightest fit for `freq` itself. ARR is then solved from that prescaler.
pub fn calc_freq_vals(freq: u32, clock_speed: u32) -> core::result::Result<(u16, u16), TimerError> {
    if freq == 0 || freq > clock_speed {
        return Err(TimerError::InvalidFrequency);
    }

    // u64, since `freq * 65_536` overflows u32 above 65khz.
    let freq = freq as u64;
    let clock_speed = clock_speed as u64;

    let psc = clock_speed / (freq * (MAX_16 as u64 + 1));
    let arr = clock_speed / (freq * (psc + 1)) - 1;

    // Neither can exceed 16 bits with a u32 clock; guard anyway.
    if psc > MAX_16 as u64 || arr > MAX_16 as u64 {
        return Err(TimerError::InvalidFrequency);
    }

    Ok((psc as u16, arr as u16))
}

/// Set up a timer as a PWM carrier at `freq` Hz, and start it. Enables the timer's
/// peripheral clock, writes `PSC` and `ARR`, latches them with an update event,
/// sets the main output enable (on timers that have one), and enables the counter.
///
/// Nothing is written if the timer or frequency is invalid.
pub fn configure_frequency<B: RegisterBus + ?Sized>(
    bus: &mut B,
    clocks: &Clocks,
    timer: TimerPeriph,
    freq: u32,
) -> Result<PwmTimer> {
    let tim = PwmTimer::try_from(timer)?;
    let clock_speed = clocks.timer_clock(tim.bus());
    let (psc, arr) = calc_freq_vals(freq, clock_speed)?;

    tim.clock_gate().enable(bus);

    bus.write(Reg::Tim(tim, TimReg::Psc), psc as u32);
    bus.write(Reg::Tim(tim, TimReg::Arr), arr as u32);

    // The prescaler is always buffered; trigger an update event so it takes effect
    // now instead of at the first overflow.
    // NOTE(write): uses all bits in this register.
    bus.write(Reg::Tim(tim, TimReg::Egr), EGR_UG);

    if tim.has_break() {
        bus.set_bits(Reg::Tim(tim, TimReg::Bdtr), BDTR_MOE);
    }

    bus.set_bits(Reg::Tim(tim, TimReg::Cr1), CR1_CEN);

    #[cfg(feature = "defmt")]
    debug!("{} running at {} Hz: PSC {}, ARR {}", tim, freq, psc, arr);

    Ok(tim)
}

/// Read back a timer's prescaler, reload, and counter-enable state.
pub fn timer_state<B: RegisterBus + ?Sized>(bus: &B, timer: TimerPeriph) -> Result<TimerState> {
    let tim = PwmTimer::try_from(timer)?;

    Ok(TimerState {
        prescaler: bus.read(Reg::Tim(tim, TimReg::Psc)) as u16,
        reload: bus.read(Reg::Tim(tim, TimReg::Arr)) as u16,
        enabled: bus.read(Reg::Tim(tim, TimReg::Cr1)) & CR1_CEN != 0,
    })
}
