//! Describes the clock tree the timers run from. This module doesn't write
//! any RCC clock-source registers: the MCU is assumed to run from its reset
//! configuration (or whatever the application set up), and `Clocks` tells the
//! timer code what that configuration is.
//!
//! Out of reset, the L432 runs from the MSI oscillator at 4Mhz, with the AHB and
//! both APB prescalers at 1. That's what `Clocks::default()` describes.
//!
//! See Figure 15 of the L4 Reference Manual (RM0394) for a visualization.

/// MSI oscillator range. Values are for `RCC_CR`, `MSIRANGE`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MsiRange {
    R100k = 0b0000,
    R200k = 0b0001,
    R400k = 0b0010,
    R800k = 0b0011,
    R1M = 0b0100,
    R2M = 0b0101,
    R4M = 0b0110, // default
    R8M = 0b0111,
    R16M = 0b1000,
    R24M = 0b1001,
    R32M = 0b1010,
    R48M = 0b1011,
}

impl MsiRange {
    /// The nominal frequency, in Hz.
    pub fn value(&self) -> u32 {
        match self {
            Self::R100k => 100_000,
            Self::R200k => 200_000,
            Self::R400k => 400_000,
            Self::R800k => 800_000,
            Self::R1M => 1_000_000,
            Self::R2M => 2_000_000,
            Self::R4M => 4_000_000,
            Self::R8M => 8_000_000,
            Self::R16M => 16_000_000,
            Self::R24M => 24_000_000,
            Self::R32M => 32_000_000,
            Self::R48M => 48_000_000,
        }
    }
}

/// System clock source.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSrc {
    Msi(MsiRange),
    Hsi,
    /// Frequency in Hz. (Or the PLL output, if you've set one up elsewhere)
    Other(u32),
}

impl InputSrc {
    pub fn value(&self) -> u32 {
        match self {
            Self::Msi(range) => range.value(),
            Self::Hsi => 16_000_000,
            Self::Other(freq) => *freq,
        }
    }
}

/// AHB prescaler. Values are for `RCC_CFGR`, `HPRE`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum HclkPrescaler {
    Div1 = 0b0000,
    Div2 = 0b1000,
    Div4 = 0b1001,
    Div8 = 0b1010,
    Div16 = 0b1011,
    Div64 = 0b1100,
    Div128 = 0b1101,
    Div256 = 0b1110,
    Div512 = 0b1111,
}

impl HclkPrescaler {
    pub fn value(&self) -> u16 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div64 => 64,
            Self::Div128 => 128,
            Self::Div256 => 256,
            Self::Div512 => 512,
        }
    }
}

/// APB1 and APB2 prescaler. Values are for `RCC_CFGR`, `PPRE1` and `PPRE2`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ApbPrescaler {
    Div1 = 0b000,
    Div2 = 0b100,
    Div4 = 0b101,
    Div8 = 0b110,
    Div16 = 0b111,
}

impl ApbPrescaler {
    pub fn value(&self) -> u8 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
        }
    }
}

/// Which APB bus a peripheral's clock comes from.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApbBus {
    Apb1,
    Apb2,
}

/// The clock configuration the MCU is running with.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clocks {
    /// The input source for the system and peripheral clocks.
    pub input_src: InputSrc,
    pub hclk_prescaler: HclkPrescaler,
    pub apb1_prescaler: ApbPrescaler,
    pub apb2_prescaler: ApbPrescaler,
}

impl Default for Clocks {
    /// The reset configuration: 4Mhz MSI, no bus division.
    fn default() -> Self {
        Self {
            input_src: InputSrc::Msi(MsiRange::R4M),
            hclk_prescaler: HclkPrescaler::Div1,
            apb1_prescaler: ApbPrescaler::Div1,
            apb2_prescaler: ApbPrescaler::Div1,
        }
    }
}

impl Clocks {
    /// System clock speed, in Hz.
    pub fn sysclk(&self) -> u32 {
        self.input_src.value()
    }

    /// HCLK speed, in Hz. Ie AHB bus, core, memory, and DMA.
    pub fn hclk(&self) -> u32 {
        self.sysclk() / self.hclk_prescaler.value() as u32
    }

    /// APB1 peripheral clock speed, in Hz.
    pub fn apb1(&self) -> u32 {
        self.hclk() / self.apb1_prescaler.value() as u32
    }

    /// APB2 peripheral clock speed, in Hz.
    pub fn apb2(&self) -> u32 {
        self.hclk() / self.apb2_prescaler.value() as u32
    }

    /// APB1 timer clock speed, in Hz.
    pub fn apb1_timer(&self) -> u32 {
        // L4 RM, 6.2.14: The timer clock frequencies are automatically defined by hardware. There are two cases:
        // 1. If the APB prescaler equals 1, the timer clock frequencies are set to the same
        // frequency as that of the APB domain.
        // 2. Otherwise, they are set to twice (×2) the frequency of the APB domain.
        if let ApbPrescaler::Div1 = self.apb1_prescaler {
            self.apb1()
        } else {
            self.apb1() * 2
        }
    }

    /// APB2 timer clock speed, in Hz.
    pub fn apb2_timer(&self) -> u32 {
        if let ApbPrescaler::Div1 = self.apb2_prescaler {
            self.apb2()
        } else {
            self.apb2() * 2
        }
    }

    /// Timer clock speed for a given bus, in Hz.
    pub fn timer_clock(&self, bus: ApbBus) -> u32 {
        match bus {
            ApbBus::Apb1 => self.apb1_timer(),
            ApbBus::Apb2 => self.apb2_timer(),
        }
    }
}
