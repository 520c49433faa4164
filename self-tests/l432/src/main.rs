//! Fades a common-anode RGB LED on TIM1: red breathes twice, then the LED cycles
//! through the rainbow forever.
//!
//! Wiring: red on D1 (PA9, TIM1_CH2), green on D0 (PA10, TIM1_CH3), blue on D9 (PA8,
//! TIM1_CH1), each through a resistor; the common anode on 3V3.

#![deny(warnings)]
#![no_std]
#![no_main]

use cortex_m::asm;
use cortex_m_rt::entry; // The runtime

use hal::{
    Clocks, L4Registers, Pin, TimerPeriph, pac,
    pwm::Pwm,
    rgb::{self, Rgb, RgbLed, Wiring},
};

// Import the panic handler
use panic_probe as _;

const LED: RgbLed = RgbLed {
    timer: TimerPeriph::Tim1,
    red: Pin::D1,
    green: Pin::D0,
    blue: Pin::D9,
    wiring: Wiring::CommonAnode,
};

/// PWM carrier frequency, in Hz. Anything well above flicker works.
const PWM_FREQ: u32 = 1_000;

/// Level change per rainbow step.
const RAINBOW_STEP: usize = 10;

#[entry]
fn main() -> ! {
    rtt_target::rtt_init_defmt!();
    // Set up microcontroller peripherals
    let dp = pac::Peripherals::take().unwrap();

    // Out of reset: MSI at 4Mhz.
    let clock_cfg = Clocks::default();

    let regs = L4Registers::new(
        dp.RCC, dp.TIM1, dp.TIM2, dp.TIM15, dp.TIM16, dp.GPIOA, dp.GPIOB, dp.GPIOC,
    );
    let mut pwm = Pwm::new(regs, clock_cfg);

    LED.off(&mut pwm).unwrap();
    pwm.configure_frequency(LED.timer, PWM_FREQ).unwrap();

    defmt::println!("Breathing");

    for _ in 0..2 {
        asm::delay(70_000);

        for duty in rgb::breathing() {
            pwm.set_channel_duty(LED.timer, LED.red, duty).unwrap();
        }
    }

    defmt::println!("Rainbow");
    LED.set(&mut pwm, Rgb::RED).unwrap();

    loop {
        for colour in rgb::rainbow(RAINBOW_STEP) {
            LED.set(&mut pwm, colour).unwrap();
        }
    }
}

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
