//! `RegisterBus` over the L432's peripherals, through the PAC.
//!
//! Owns the PAC singletons for the peripherals PWM output touches, so nothing else
//! can hold them while this is in use.

use cortex_m::interrupt::free;
use paste::paste;

use crate::{
    error::Result,
    gpio::{self, AltFn, AltFnRouter, Pin, Port},
    pac::{GPIOA, GPIOB, GPIOC, RCC, TIM1, TIM15, TIM16, TIM2},
    regs::{GpioReg, RccReg, Reg, RegisterBus, TimReg},
    timer::PwmTimer,
};

/// Read and write methods for one timer, over the registers it has. Registers
/// not listed read as 0, and writes to them are dropped: TIM2 has no `BDTR`, TIM15
/// has 2 channels and TIM16 has 1.
macro_rules! tim_access {
    ($tim:ident, [$($reg:ident => $accessor:ident),+ $(,)?]) => {
        paste! {
            fn [<read_ $tim>](&self, reg: TimReg) -> u32 {
                match reg {
                    $(TimReg::$reg => self.$tim.$accessor().read().bits(),)+
                    #[allow(unreachable_patterns)]
                    _ => 0,
                }
            }

            fn [<write_ $tim>](&mut self, reg: TimReg, value: u32) {
                match reg {
                    $(TimReg::$reg => {
                        self.$tim.$accessor().write(|w| unsafe { w.bits(value) });
                    })+
                    #[allow(unreachable_patterns)]
                    _ => (),
                }
            }
        }
    };
}

/// Read and write methods for a GPIO port's mode and alternate function registers.
macro_rules! gpio_access {
    ($gpio:ident) => {
        paste! {
            fn [<read_ $gpio>](&self, reg: GpioReg) -> u32 {
                match reg {
                    GpioReg::Moder => self.$gpio.moder().read().bits(),
                    GpioReg::Afrl => self.$gpio.afrl().read().bits(),
                    GpioReg::Afrh => self.$gpio.afrh().read().bits(),
                }
            }

            fn [<write_ $gpio>](&mut self, reg: GpioReg, value: u32) {
                match reg {
                    GpioReg::Moder => {
                        self.$gpio.moder().write(|w| unsafe { w.bits(value) });
                    }
                    GpioReg::Afrl => {
                        self.$gpio.afrl().write(|w| unsafe { w.bits(value) });
                    }
                    GpioReg::Afrh => {
                        self.$gpio.afrh().write(|w| unsafe { w.bits(value) });
                    }
                }
            }
        }
    };
}

/// Register access for PWM on the L432.
pub struct L4Registers {
    rcc: RCC,
    tim1: TIM1,
    tim2: TIM2,
    tim15: TIM15,
    tim16: TIM16,
    gpioa: GPIOA,
    gpiob: GPIOB,
    gpioc: GPIOC,
}

impl L4Registers {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rcc: RCC,
        tim1: TIM1,
        tim2: TIM2,
        tim15: TIM15,
        tim16: TIM16,
        gpioa: GPIOA,
        gpiob: GPIOB,
        gpioc: GPIOC,
    ) -> Self {
        Self {
            rcc,
            tim1,
            tim2,
            tim15,
            tim16,
            gpioa,
            gpiob,
            gpioc,
        }
    }

    /// Hand back the peripherals.
    pub fn free(self) -> (RCC, TIM1, TIM2, TIM15, TIM16, GPIOA, GPIOB, GPIOC) {
        (
            self.rcc, self.tim1, self.tim2, self.tim15, self.tim16, self.gpioa, self.gpiob,
            self.gpioc,
        )
    }

    tim_access!(tim1, [
        Cr1 => cr1, Egr => egr, Ccmr1 => ccmr1_output, Ccmr2 => ccmr2_output,
        Ccer => ccer, Psc => psc, Arr => arr, Ccr1 => ccr1, Ccr2 => ccr2, Ccr3 => ccr3,
        Ccr4 => ccr4, Bdtr => bdtr,
    ]);

    tim_access!(tim2, [
        Cr1 => cr1, Egr => egr, Ccmr1 => ccmr1_output, Ccmr2 => ccmr2_output,
        Ccer => ccer, Psc => psc, Arr => arr, Ccr1 => ccr1, Ccr2 => ccr2, Ccr3 => ccr3,
        Ccr4 => ccr4,
    ]);

    tim_access!(tim15, [
        Cr1 => cr1, Egr => egr, Ccmr1 => ccmr1_output, Ccer => ccer, Psc => psc,
        Arr => arr, Ccr1 => ccr1, Ccr2 => ccr2, Bdtr => bdtr,
    ]);

    tim_access!(tim16, [
        Cr1 => cr1, Egr => egr, Ccmr1 => ccmr1_output, Ccer => ccer, Psc => psc,
        Arr => arr, Ccr1 => ccr1, Bdtr => bdtr,
    ]);

    gpio_access!(gpioa);
    gpio_access!(gpiob);
    gpio_access!(gpioc);

    fn read_rcc(&self, reg: RccReg) -> u32 {
        match reg {
            RccReg::Ahb2enr => self.rcc.ahb2enr().read().bits(),
            RccReg::Apb1enr1 => self.rcc.apb1enr1().read().bits(),
            RccReg::Apb2enr => self.rcc.apb2enr().read().bits(),
        }
    }

    fn write_rcc(&mut self, reg: RccReg, value: u32) {
        match reg {
            RccReg::Ahb2enr => {
                self.rcc.ahb2enr().write(|w| unsafe { w.bits(value) });
            }
            RccReg::Apb1enr1 => {
                self.rcc.apb1enr1().write(|w| unsafe { w.bits(value) });
            }
            RccReg::Apb2enr => {
                self.rcc.apb2enr().write(|w| unsafe { w.bits(value) });
            }
        }
    }
}

impl RegisterBus for L4Registers {
    fn read(&self, reg: Reg) -> u32 {
        match reg {
            Reg::Rcc(r) => self.read_rcc(r),
            Reg::Tim(PwmTimer::Tim1, r) => self.read_tim1(r),
            Reg::Tim(PwmTimer::Tim2, r) => self.read_tim2(r),
            Reg::Tim(PwmTimer::Tim15, r) => self.read_tim15(r),
            Reg::Tim(PwmTimer::Tim16, r) => self.read_tim16(r),
            Reg::Gpio(Port::A, r) => self.read_gpioa(r),
            Reg::Gpio(Port::B, r) => self.read_gpiob(r),
            Reg::Gpio(Port::C, r) => self.read_gpioc(r),
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        match reg {
            Reg::Rcc(r) => self.write_rcc(r, value),
            Reg::Tim(PwmTimer::Tim1, r) => self.write_tim1(r, value),
            Reg::Tim(PwmTimer::Tim2, r) => self.write_tim2(r, value),
            Reg::Tim(PwmTimer::Tim15, r) => self.write_tim15(r, value),
            Reg::Tim(PwmTimer::Tim16, r) => self.write_tim16(r, value),
            Reg::Gpio(Port::A, r) => self.write_gpioa(r, value),
            Reg::Gpio(Port::B, r) => self.write_gpiob(r, value),
            Reg::Gpio(Port::C, r) => self.write_gpioc(r, value),
        }
    }

    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Reg, f: F) {
        // RCC enable registers are shared with peripherals we don't own; don't let an
        // interrupt handler's write land between our read and write.
        if let Reg::Rcc(_) = reg {
            free(|_| {
                let value = self.read(reg);
                self.write(reg, f(value));
            });
        } else {
            let value = self.read(reg);
            self.write(reg, f(value));
        }
    }
}

impl AltFnRouter for L4Registers {
    fn bind_alternate_function(&mut self, pin: Pin, function: AltFn) -> Result<()> {
        gpio::set_alt_fn(self, pin, function);
        Ok(())
    }
}
