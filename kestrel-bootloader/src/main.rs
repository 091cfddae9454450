// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bootloader for STM32L0: installs a committed staged update, verifies the
//! resident firmware, and hands control to it along with the APT.

#![no_std]
#![no_main]

mod apt_host;
mod boot_host;
mod flash;
mod layout;
mod panic;
mod peripherals;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

use boot_host::Stm32l0Host;
use kestrel_core::apt::Apt;
use kestrel_core::boot::BootHost;
use kestrel_core::error::{PanicReason, PanicType};

/// Flash page size on the STM32L071KB (also the delta block size this
/// bootloader was built for).
pub const PAGE: usize = 128;
pub const BLK: usize = 128;
pub const FLASH_PAGE_SIZE: usize = 128;

#[entry]
fn main() -> ! {
    defmt::println!("bootloader init");

    let p = peripherals::init();
    panic::install_led(p.led);

    let l = layout::boot_layout();
    let mut host = Stm32l0Host;

    let entry = kestrel_core::boot::run::<Stm32l0Host, PAGE, BLK>(&mut host, &l);

    let apt = apt_host::build();
    jump_to_firmware(&mut host, entry, &apt);
}

/// Hand off to firmware at `entry`, passing a pointer to `apt`. Firmware is
/// never supposed to return; if its entry function does, that's treated the
/// same as any other boot-sequence failure.
fn jump_to_firmware(host: &mut Stm32l0Host, entry: u32, apt: &Apt) -> ! {
    let entry_fn: extern "C" fn(*const Apt) = unsafe { core::mem::transmute(entry as *const ()) };
    entry_fn(apt as *const Apt);
    host.panic(PanicType::Bootloader, PanicReason::FwReturn, entry)
}
