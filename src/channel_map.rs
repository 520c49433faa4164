//! Which timer channel drives each header pin.
//!
//! Each PWM timer has a table indexed by `Pin`. An entry is either `None` (the pin
//! isn't wired to that timer) or a `ChannelCode`: the zero-based channel index
//! shifted left by one, with the low bit set for the complementary (`N`) output.
//!
//! Tables are from the STM32L432KC datasheet (DS11451), Table 15 (AF1 and AF14 columns),
//! restricted to pins broken out on the Nucleo-32.

use crate::{
    error::Result,
    gpio::Pin,
    timer::{PwmTimer, TimChannel, TimerError, TimerPeriph},
};

/// A timer output, encoded as `(channel index << 1) | complementary`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelCode(u8);

impl ChannelCode {
    pub const C1: Self = Self(0);
    pub const C1N: Self = Self(1);
    pub const C2: Self = Self(2);
    pub const C2N: Self = Self(3);
    pub const C3: Self = Self(4);
    pub const C3N: Self = Self(5);
    pub const C4: Self = Self(6);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn channel(self) -> TimChannel {
        match self.0 >> 1 {
            0 => TimChannel::C1,
            1 => TimChannel::C2,
            2 => TimChannel::C3,
            _ => TimChannel::C4,
        }
    }

    pub fn is_complementary(self) -> bool {
        self.0 & 1 != 0
    }

    /// Output enable bit in `TIMx_CCER`. `CCxE` bits are at 0, 4, 8, 12; `CCxNE` bits
    /// are 2 above their channel's `CCxE`.
    pub fn ccer_bit(self) -> u32 {
        1 << (2 * self.0 as u32)
    }
}

/// A pin resolved to a timer output.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelBinding {
    pub timer: PwmTimer,
    pub channel: TimChannel,
    /// This is the inverted `CHxN` output, sharing `CCRx` with `CHx`.
    pub complementary: bool,
}

impl ChannelBinding {
    pub fn code(&self) -> ChannelCode {
        ChannelCode((self.channel.index() << 1) | self.complementary as u8)
    }
}

type ChannelTable = [Option<ChannelCode>; Pin::COUNT];

/// Build a `ChannelTable`; pins not listed are unconnected.
macro_rules! channel_table {
    ($($pin:ident => $code:ident),* $(,)?) => {{
        let mut table: ChannelTable = [None; Pin::COUNT];
        $(
            table[Pin::$pin as usize] = Some(ChannelCode::$code);
        )*
        table
    }};
}

static TIM1_CHANNELS: ChannelTable = channel_table! {
    A6 => C1N,  // PA7
    D0 => C3,   // PA10
    D1 => C2,   // PA9
    D3 => C2N,  // PB0
    D6 => C3N,  // PB1
    D9 => C1,   // PA8
    D10 => C4,  // PA11
};

static TIM2_CHANNELS: ChannelTable = channel_table! {
    A0 => C1,   // PA0
    A1 => C2,   // PA1
    A2 => C4,   // PA3
    A4 => C1,   // PA5
    A7 => C3,   // PA2
    D13 => C2,  // PB3
};

static TIM15_CHANNELS: ChannelTable = channel_table! {
    A1 => C1N,  // PA1
    A2 => C2,   // PA3
    A7 => C1,   // PA2
};

static TIM16_CHANNELS: ChannelTable = channel_table! {
    A5 => C1,   // PA6
    D5 => C1N,  // PB6
};

fn table(timer: PwmTimer) -> &'static ChannelTable {
    match timer {
        PwmTimer::Tim1 => &TIM1_CHANNELS,
        PwmTimer::Tim2 => &TIM2_CHANNELS,
        PwmTimer::Tim15 => &TIM15_CHANNELS,
        PwmTimer::Tim16 => &TIM16_CHANNELS,
    }
}

/// Look up the channel a pin is wired to on a timer.
pub fn resolve(timer: TimerPeriph, pin: Pin) -> Result<ChannelBinding> {
    let timer = PwmTimer::try_from(timer)?;
    let code = table(timer)[pin.index()].ok_or(TimerError::InvalidChannel)?;

    Ok(ChannelBinding {
        timer,
        channel: code.channel(),
        complementary: code.is_complementary(),
    })
}

/// All pins a timer can drive, with their channel codes.
pub fn valid_pins(timer: PwmTimer) -> impl Iterator<Item = (Pin, ChannelCode)> {
    Pin::ALL
        .into_iter()
        .filter_map(move |pin| table(timer)[pin.index()].map(|code| (pin, code)))
}
