//! Board pins, and routing a pin to a peripheral with its alternate function.
//!
//! Pins are named as on the Nucleo-32 silkscreen (Arduino Nano layout), and map to
//! fixed GPIO port/pin pairs on the STM32L432KC.

use crate::{
    error::Result,
    regs::{ClockGate, GpioReg, MODER_ALT, RccReg, Reg, RegisterBus},
};

/// GPIO port letter
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    A,
    B,
    C,
}

impl Port {
    /// Port clocks are on `AHB2ENR`, bits 0 (A), 1 (B), 2 (C).
    pub fn clock_gate(self) -> ClockGate {
        match self {
            Self::A => ClockGate::new(RccReg::Ahb2enr, 0),
            Self::B => ClockGate::new(RccReg::Ahb2enr, 1),
            Self::C => ClockGate::new(RccReg::Ahb2enr, 2),
        }
    }
}

/// A pin on the Nucleo-32 headers, by its silkscreen label.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Pin {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    D8,
    D9,
    D10,
    D11,
    D12,
    D13,
}

impl Pin {
    pub const COUNT: usize = 22;

    pub const ALL: [Self; Self::COUNT] = [
        Self::A0,
        Self::A1,
        Self::A2,
        Self::A3,
        Self::A4,
        Self::A5,
        Self::A6,
        Self::A7,
        Self::D0,
        Self::D1,
        Self::D2,
        Self::D3,
        Self::D4,
        Self::D5,
        Self::D6,
        Self::D7,
        Self::D8,
        Self::D9,
        Self::D10,
        Self::D11,
        Self::D12,
        Self::D13,
    ];

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The GPIO port and pin number (0 - 15) this header pin is wired to.
    pub fn port_pin(self) -> (Port, u8) {
        match self {
            Self::A0 => (Port::A, 0),
            Self::A1 => (Port::A, 1),
            Self::A2 => (Port::A, 3),
            Self::A3 => (Port::A, 4),
            Self::A4 => (Port::A, 5),
            Self::A5 => (Port::A, 6),
            Self::A6 => (Port::A, 7),
            Self::A7 => (Port::A, 2),
            Self::D0 => (Port::A, 10),
            Self::D1 => (Port::A, 9),
            Self::D2 => (Port::A, 12),
            Self::D3 => (Port::B, 0),
            Self::D4 => (Port::B, 7),
            Self::D5 => (Port::B, 6),
            Self::D6 => (Port::B, 1),
            Self::D7 => (Port::C, 14),
            Self::D8 => (Port::C, 15),
            Self::D9 => (Port::A, 8),
            Self::D10 => (Port::A, 11),
            Self::D11 => (Port::B, 5),
            Self::D12 => (Port::B, 4),
            Self::D13 => (Port::B, 3),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
/// Values for `GPIOx_AFRL` and `GPIOx_AFRH`.
pub enum AltFn {
    Af0 = 0b0000,
    Af1 = 0b0001,
    Af2 = 0b0010,
    Af3 = 0b0011,
    Af4 = 0b0100,
    Af5 = 0b0101,
    Af6 = 0b0110,
    Af7 = 0b0111,
    Af8 = 0b1000,
    Af9 = 0b1001,
    Af10 = 0b1010,
    Af11 = 0b1011,
    Af12 = 0b1100,
    Af13 = 0b1101,
    Af14 = 0b1110,
    Af15 = 0b1111,
}

/// Connects a pin's output to an internal peripheral signal.
pub trait AltFnRouter {
    /// Put `pin` in alternate function mode, selecting `function`.
    fn bind_alternate_function(&mut self, pin: Pin, function: AltFn) -> Result<()>;
}

impl<R: AltFnRouter + ?Sized> AltFnRouter for &mut R {
    fn bind_alternate_function(&mut self, pin: Pin, function: AltFn) -> Result<()> {
        (**self).bind_alternate_function(pin, function)
    }
}

/// Set a pin to alternate function mode with the given function, over the GPIO
/// registers: enables the port clock, sets the pin's `MODER` field to `0b10`, and
/// its 4-bit `AFRL`/`AFRH` field to `function`. Other pins' fields are untouched.
pub fn set_alt_fn<B: RegisterBus + ?Sized>(bus: &mut B, pin: Pin, function: AltFn) {
    let (port, num) = pin.port_pin();
    let num = num as u32;

    port.clock_gate().enable(bus);

    // Set the AF before switching the mode, so the pin doesn't briefly output
    // whatever AF0 is.
    let (afr, shift) = if num < 8 {
        (GpioReg::Afrl, num * 4)
    } else {
        (GpioReg::Afrh, (num - 8) * 4)
    };
    bus.modify(Reg::Gpio(port, afr), |v| {
        (v & !(0b1111 << shift)) | ((function as u32) << shift)
    });

    let shift = num * 2;
    bus.modify(Reg::Gpio(port, GpioReg::Moder), |v| {
        (v & !(0b11 << shift)) | (MODER_ALT << shift)
    });
}
