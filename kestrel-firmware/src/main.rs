// Copyright (c) 2026 ADNT Sarl <info@adnt.io>
// SPDX-License-Identifier: MIT

//! Sample application firmware. Demonstrates the capability table the
//! bootloader hands off at entry: checking its version, re-hashing itself
//! with `apt.sha256`, staging a pending update through `apt.update`, and
//! raising a firmware-side panic through `apt.panic`.

#![no_std]
#![no_main]

use defmt_rtt as _;
use kestrel_core::apt::{Apt, APT_VERSION};
use kestrel_core::error::PanicReason;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

/// Placeholder `size`, patched in place by the packer once the final image
/// length is known -- the CRC covers this header too, so it can't be
/// computed before the patch.
const MAGIC_SIZE: u32 = 0xff1234ff;

/// A would-be "update staged by the application" pointer, kept at a fixed
/// flash offset past this image. Firmware that can fetch updates over the
/// air writes the staged image here and a nonzero value here before
/// resetting into the bootloader; this sample never writes it, so the
/// check below always finds it erased.
const PENDING_UPDATE_PTR: *const u32 = 0x0801_0000 as *const u32;

#[repr(C)]
struct FwHeader {
    crc: u32,
    size: u32,
    entrypoint: u32,
}

#[link_section = ".fwhdr"]
#[used]
static FWHDR: FwHeader = FwHeader {
    crc: 0,
    size: MAGIC_SIZE,
    entrypoint: _start as usize as u32,
};

/// Entry point called by the bootloader once the resident firmware's
/// integrity check has passed. `apt` lives at a fixed, bootloader-owned
/// address for the lifetime of the firmware image; treating it as
/// `'static` is sound as long as this function never returns.
#[no_mangle]
pub extern "C" fn _start(apt: *const Apt) -> ! {
    let apt: &'static Apt = unsafe { &*apt };

    defmt::println!("firmware started, apt version {=u32:#x}", apt.version);

    if apt.version < APT_VERSION {
        // This firmware relies on capabilities added in APT_VERSION; an
        // older bootloader can't provide them. Raising through apt.panic
        // rather than looping keeps the failure visible on the blink
        // channel instead of silently misbehaving.
        (apt.panic)(PanicReason::Update as u32, apt.version);
    }

    let fw = unsafe {
        core::slice::from_raw_parts(
            &FWHDR as *const FwHeader as *const u8,
            FWHDR.size as usize,
        )
    };
    let mut hash = [0u32; 8];
    (apt.sha256)(&mut hash as *mut _, fw.as_ptr(), fw.len() as u32);
    defmt::println!("self hash[0] = {=u32:#x}", hash[0]);

    maybe_stage_update(apt);

    loop {
        cortex_m::asm::wfi();
    }
}

/// Stage a pending update if one has been written to [`PENDING_UPDATE_PTR`]
/// by application-level update-fetch logic. A real firmware would populate
/// this after downloading an image over whatever transport it has; this
/// sample only demonstrates the call, so the pointer is always found erased
/// (`0xffff_ffff`) and `apt.update` is never actually reached.
fn maybe_stage_update(apt: &'static Apt) {
    let staged = unsafe { core::ptr::read(PENDING_UPDATE_PTR) };
    if staged != 0xffff_ffff && staged != 0 {
        let rc = (apt.update)(staged as *const u8, core::ptr::null());
        defmt::println!("apt.update({=u32:#x}) -> {=u32}", staged, rc);
    }
}
