// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Raw register access to the STM32L0 flash interface (FLASH_PECR unlock
//! sequence, half-page programming) and the memory-mapped data EEPROM.
//!
//! Both main flash and data EEPROM are gated by the same PECR lock on this
//! family, so a single unlock/lock pair covers writes to either.

use kestrel_core::{BootError, BootResult};

const FLASH_IF_BASE: u32 = 0x4002_2000;
const FLASH_PECR: *mut u32 = (FLASH_IF_BASE + 0x04) as *mut u32;
const FLASH_PEKEYR: *mut u32 = (FLASH_IF_BASE + 0x0C) as *mut u32;
const FLASH_PRGKEYR: *mut u32 = (FLASH_IF_BASE + 0x10) as *mut u32;
const FLASH_SR: *mut u32 = (FLASH_IF_BASE + 0x18) as *mut u32;

const PECR_PELOCK: u32 = 1 << 0;
const PECR_PROG: u32 = 1 << 3;
const PECR_ERASE: u32 = 1 << 9;
const PECR_FPRG: u32 = 1 << 10;
const SR_BSY: u32 = 1 << 0;
const SR_EOP: u32 = 1 << 1;

pub const FLASH_BASE: u32 = 0x0800_0000;
pub const EEPROM_BASE: u32 = 0x0808_0000;
pub const HALF_PAGE_WORDS: usize = 16;

/// Unlock PECR for program/erase operations on flash or EEPROM.
pub fn unlock() {
    unsafe {
        FLASH_PEKEYR.write_volatile(0x89AB_CDEF);
        FLASH_PEKEYR.write_volatile(0x0203_0405);
        FLASH_PRGKEYR.write_volatile(0x8C9D_AEBF);
        FLASH_PRGKEYR.write_volatile(0x1314_1516);
        FLASH_PECR.write_volatile(FLASH_PECR.read_volatile() | PECR_PROG);
    }
}

pub fn lock() {
    unsafe {
        FLASH_PECR.write_volatile(FLASH_PECR.read_volatile() | PECR_PELOCK);
    }
}

fn wait_bsy() {
    unsafe {
        while FLASH_SR.read_volatile() & SR_BSY != 0 {
            core::hint::spin_loop();
        }
    }
}

fn check_eop() -> BootResult<()> {
    unsafe {
        let sr = FLASH_SR.read_volatile();
        if sr & SR_EOP != 0 {
            FLASH_SR.write_volatile(SR_EOP);
            Ok(())
        } else {
            Err(BootError::General)
        }
    }
}

/// Erase and program one flash page. `dst` must be page-aligned; `page.len()`
/// must be a multiple of 4 and no larger than the target's page size.
///
/// # Safety
/// Caller must have called [`unlock`] first and must pass a `dst` pointer
/// that lies within the writable application flash region.
pub unsafe fn write_page(dst: *mut u32, page: &[u8]) -> BootResult<()> {
    unsafe {
        FLASH_PECR.write_volatile(FLASH_PECR.read_volatile() | PECR_ERASE);
        dst.write_volatile(0);
        wait_bsy();
        check_eop()?;
        FLASH_PECR.write_volatile(FLASH_PECR.read_volatile() & !PECR_ERASE);

        FLASH_PECR.write_volatile(FLASH_PECR.read_volatile() | PECR_FPRG);
        let words = page.len() / 4;
        let mut i = 0;
        while i < words {
            let n = core::cmp::min(HALF_PAGE_WORDS, words - i);
            for j in 0..n {
                let off = (i + j) * 4;
                let w = u32::from_le_bytes(page[off..off + 4].try_into().unwrap());
                dst.add(i + j).write_volatile(w);
            }
            wait_bsy();
            check_eop()?;
            i += n;
        }
        FLASH_PECR.write_volatile(FLASH_PECR.read_volatile() & !PECR_FPRG);
    }
    Ok(())
}

/// Write a single EEPROM word and wait for completion.
///
/// # Safety
/// Caller must have called [`unlock`] first.
pub unsafe fn write_eeprom_word(dst: *mut u32, val: u32) {
    unsafe {
        dst.write_volatile(val);
        wait_bsy();
    }
}
