//! Register-level access to the peripherals this crate drives: RCC clock gates,
//! the TIM capture/compare blocks, and GPIO alternate-function selection.
//!
//! Registers are named with enums instead of address offsets. Drivers are written
//! against the `RegisterBus` trait; `hw::L4Registers` implements it over the PAC,
//! and tests implement it with an in-memory register file.
//!
//! Bit positions are from the L4 Reference Manual (RM0394), sections 6.4, 8.5,
//! 26.4 (TIM1), 27.4 (TIM2) and 28.6 (TIM15/16).

use crate::{gpio::Port, timer::PwmTimer};

/// RCC registers used for clock gating.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RccReg {
    /// GPIO port clocks.
    Ahb2enr,
    /// TIM2 (and other APB1 peripherals).
    Apb1enr1,
    /// TIM1, TIM15, TIM16.
    Apb2enr,
}

/// Timer registers touched by PWM setup.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimReg {
    Cr1,
    Egr,
    Ccmr1,
    Ccmr2,
    Ccer,
    Psc,
    Arr,
    Ccr1,
    Ccr2,
    Ccr3,
    Ccr4,
    Bdtr,
}

/// GPIO registers used for alternate function routing.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpioReg {
    Moder,
    /// Alternate function selection for pins 0 - 7.
    Afrl,
    /// Alternate function selection for pins 8 - 15.
    Afrh,
}

/// A single 32-bit peripheral register.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    Rcc(RccReg),
    Tim(PwmTimer, TimReg),
    Gpio(Port, GpioReg),
}

/// `TIMx_CR1` counter enable.
pub const CR1_CEN: u32 = 1 << 0;
/// `TIMx_EGR` update generation. Reloads the prescaler and the preloaded registers.
pub const EGR_UG: u32 = 1 << 0;
/// `TIMx_BDTR` main output enable. Required on timers with a break unit, or the
/// outputs stay disabled regardless of `CCER`.
pub const BDTR_MOE: u32 = 1 << 15;

/// Output compare mode field (`OCxM[2:0]`) of the first channel in a `CCMRx` register.
/// The second channel's fields are 8 bits higher.
pub const CCMR_OCM_POS: u32 = 4;
pub const CCMR_OCM_MASK: u32 = 0b111 << CCMR_OCM_POS;
/// `OCxM` value for PWM mode 1: in upcounting, the channel is active as long as
/// `TIMx_CNT < TIMx_CCRx`, else inactive. The complementary output is the inverse.
pub const CCMR_OCM_PWM1: u32 = 0b110;
/// `OCxM[3]`, the split-off high bit of the mode field.
pub const CCMR_OCM_3: u32 = 1 << 16;
/// `OCxPE`: output compare preload enable.
pub const CCMR_OCPE: u32 = 1 << 3;

/// GPIO `MODER` field value for alternate function mode.
pub const MODER_ALT: u32 = 0b10;

/// Read and write access to 32-bit peripheral registers. All register writes made by
/// this crate go through this trait.
pub trait RegisterBus {
    fn read(&self, reg: Reg) -> u32;

    fn write(&mut self, reg: Reg, value: u32);

    /// Read-modify-write.
    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Reg, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    fn set_bits(&mut self, reg: Reg, mask: u32) {
        self.modify(reg, |v| v | mask);
    }

    fn clear_bits(&mut self, reg: Reg, mask: u32) {
        self.modify(reg, |v| v & !mask);
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }
}

/// A clock enable bit: the RCC register and bit position that gate a peripheral.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockGate {
    pub reg: RccReg,
    pub bit: u8,
}

impl ClockGate {
    pub const fn new(reg: RccReg, bit: u8) -> Self {
        Self { reg, bit }
    }

    /// Set the enable bit. Leaves other peripherals' bits alone.
    pub fn enable<B: RegisterBus + ?Sized>(&self, bus: &mut B) {
        bus.set_bits(Reg::Rcc(self.reg), 1 << self.bit);
    }

    pub fn is_enabled<B: RegisterBus + ?Sized>(&self, bus: &B) -> bool {
        bus.read(Reg::Rcc(self.reg)) & (1 << self.bit) != 0
    }
}
