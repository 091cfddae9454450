// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Low-level panic channel: blink out type/reason/address as nibble counts
//! on the status LED, then reset. This is the wire-level mechanism behind
//! both [`crate::boot_host::Stm32l0Host::panic`] and the APT's
//! firmware-facing panic entry, which share the same blink pattern but
//! carry different reason namespaces.
//!
//! The LED is handed off to a global once at startup so this channel stays
//! reachable from the APT's `extern "C"` panic function, which carries no
//! host state of its own.

use cortex_m::peripheral::SCB;

use crate::peripherals::{self, LedPin};

static mut PANIC_LED: Option<LedPin> = None;

/// Hand the LED pin to the panic channel. Must be called exactly once
/// during startup, before any panic can occur.
pub fn install_led(led: LedPin) {
    unsafe {
        PANIC_LED = Some(led);
    }
}

fn pause(units: u32) {
    cortex_m::asm::delay(units * 400_000);
}

/// Blink `v` nibble-by-nibble, least-significant nibble first: each nibble
/// blinks `n + 1` times, with a longer pause between nibbles.
fn blink_value(led: &mut LedPin, mut v: u32) {
    loop {
        let n = v & 0xf;
        for _ in 0..=n {
            peripherals::blink(led, 1, 60);
        }
        v >>= 4;
        pause(12);
        if v == 0 {
            break;
        }
    }
}

/// Disable interrupts, blink `kind`/`reason`/`addr`, then reset. Never
/// returns.
pub fn raw_panic(kind: u32, reason: u32, addr: u32) -> ! {
    cortex_m::interrupt::disable();

    if let Some(led) = unsafe { PANIC_LED.as_mut() } {
        for _ in 0..3 {
            peripherals::blink(led, 1, 300);
            blink_value(led, kind);
            pause(30);
            blink_value(led, reason);
            pause(30);
            blink_value(led, addr);
            pause(30);
        }
    }

    SCB::sys_reset();
}
