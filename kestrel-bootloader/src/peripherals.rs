// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Clock and GPIO bring-up for the bootloader binary.

use embedded_hal::digital::OutputPin;
use stm32l0xx_hal::gpio::gpioa::PA5;
use stm32l0xx_hal::gpio::{Output, PushPull};
use stm32l0xx_hal::pac;
use stm32l0xx_hal::prelude::*;
use stm32l0xx_hal::rcc::Config as RccConfig;

pub type LedPin = PA5<Output<PushPull>>;

pub struct Peripherals {
    pub led: LedPin,
}

pub fn init() -> Peripherals {
    let dp = pac::Peripherals::take().unwrap();
    let mut rcc = dp.RCC.freeze(RccConfig::msi(stm32l0xx_hal::rcc::MSIRange::Range5));
    let gpioa = dp.GPIOA.split(&mut rcc);

    Peripherals {
        led: gpioa.pa5.into_push_pull_output(),
    }
}

/// Blink `count` times with `period_ms` between transitions, the same
/// startup heartbeat every bootloader stage uses.
pub fn blink(led: &mut LedPin, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        cortex_m::asm::delay(period_ms * 4_000);
        led.set_low().ok();
        cortex_m::asm::delay(period_ms * 4_000);
    }
}
