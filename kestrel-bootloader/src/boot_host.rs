// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! [`Stm32l0Host`]: the concrete [`HostFlash`]/[`BootHost`] implementation
//! for this target. It carries no fields of its own -- flash and the data
//! EEPROM are both memory-mapped and globally addressable on this family,
//! so there is no peripheral handle to own.

use kestrel_core::boot::BootHost;
use kestrel_core::data::{Config, Eui48, Hash32};
use kestrel_core::error::{BootResult, PanicReason, PanicType};
use kestrel_core::layout::{AcceptAll, HwIdPolicy};
use kestrel_core::sink::HostFlash;

use crate::flash;
use crate::panic::raw_panic;

/// Total flash on the STM32L071KB.
pub const FLASH_SIZE: u32 = 128 * 1024;
/// First byte after the bootloader image. Absolute address.
pub const FW_BASE_ADDR: u32 = 0x0800_2000;
/// Data EEPROM base. Absolute address.
pub const EEPROM_BASE_ADDR: u32 = 0x0808_0000;
pub const EEPROM_SIZE: u32 = 6 * 1024;

pub struct Stm32l0Host;

impl HostFlash for Stm32l0Host {
    fn unlock(&mut self) {
        flash::unlock();
    }

    fn lock(&mut self) {
        flash::lock();
    }

    fn write_page(&mut self, dst_offset: u32, page: &[u8]) -> BootResult<()> {
        let dst = (flash::FLASH_BASE + dst_offset) as *mut u32;
        unsafe { flash::write_page(dst, page) }
    }

    fn read(&self, offset: u32, buf: &mut [u8]) {
        let src = (flash::FLASH_BASE + offset) as *const u8;
        unsafe {
            core::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len());
        }
    }
}

impl BootHost for Stm32l0Host {
    fn config(&self) -> Config {
        unsafe { core::ptr::read(EEPROM_BASE_ADDR as *const Config) }
    }

    fn eeprom_unlock(&mut self) {
        flash::unlock();
    }

    fn eeprom_lock(&mut self) {
        flash::lock();
    }

    fn eeprom_write_hash(&mut self, hash: Hash32) {
        // hash starts right after the two fwupdate pointers in Config's layout.
        let base = (EEPROM_BASE_ADDR + 8) as *mut u32;
        for (i, word) in hash.iter().enumerate() {
            unsafe { flash::write_eeprom_word(base.add(i), *word) };
        }
    }

    fn eeprom_write_fwupdate1(&mut self, ptr: u32) {
        unsafe { flash::write_eeprom_word(EEPROM_BASE_ADDR as *mut u32, ptr) };
    }

    fn eeprom_write_fwupdate2(&mut self, ptr: u32) {
        let dst = (EEPROM_BASE_ADDR + 4) as *mut u32;
        unsafe { flash::write_eeprom_word(dst, ptr) };
    }

    fn hwid_accepted(&self, hwid: &Eui48) -> bool {
        AcceptAll.accepts(hwid)
    }

    fn current_fw(&self) -> &'static [u8] {
        let len = (flash::FLASH_BASE + FLASH_SIZE - FW_BASE_ADDR) as usize;
        unsafe { core::slice::from_raw_parts(FW_BASE_ADDR as *const u8, len) }
    }

    fn staged_update(&self, ptr_off: u32) -> &'static [u8] {
        let end = FLASH_SIZE;
        let len = (end - ptr_off) as usize;
        let ptr = (flash::FLASH_BASE + ptr_off) as *const u8;
        unsafe { core::slice::from_raw_parts(ptr, len) }
    }

    fn panic(&mut self, kind: PanicType, reason: PanicReason, addr: u32) -> ! {
        raw_panic(kind.to_wire(), reason.to_wire(), addr)
    }
}
