// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Target memory geometry, passed in by the caller rather than hard-coded
//! as globals so the same algorithms serve the real target and host tests.

use crate::data::Eui48;

/// Flash and EEPROM geometry for a specific target.
#[derive(Clone, Copy, Debug)]
pub struct BootLayout {
    pub flash_base: u32,
    pub flash_size: u32,
    pub fw_base: u32,
    pub eeprom_base: u32,
    pub eeprom_size: u32,
    pub flash_page_size: u32,
}

impl BootLayout {
    /// STM32L0-class geometry matching the original target: 128-byte flash
    /// pages, firmware resident directly after the bootloader image.
    pub const fn stm32l0(flash_size: u32, fw_base: u32, eeprom_base: u32, eeprom_size: u32) -> Self {
        BootLayout {
            flash_base: 0x0800_0000,
            flash_size,
            fw_base,
            eeprom_base,
            eeprom_size,
            flash_page_size: 128,
        }
    }

    pub fn is_page_multiple(&self, size: u32) -> bool {
        size % self.flash_page_size == 0
    }

    pub fn round_to_page(&self, size: u32) -> u32 {
        (size + self.flash_page_size - 1) & !(self.flash_page_size - 1)
    }

    /// Remaining space between `fw_base` and `update_ptr`, the ceiling a
    /// staged update's decompressed firmware (and any delta scratch area)
    /// must fit under without clobbering the update image itself.
    pub fn room_before(&self, update_ptr: u32) -> u32 {
        update_ptr.saturating_sub(self.fw_base)
    }

    /// Sanity-check the layout itself: flash and EEPROM regions must not
    /// overlap and the page size must be a power of two (O2).
    pub fn validate(&self) -> bool {
        self.flash_page_size.is_power_of_two()
            && self.fw_base >= self.flash_base
            && self.fw_base < self.flash_base + self.flash_size
            && (self.eeprom_base >= self.flash_base + self.flash_size
                || self.eeprom_base + self.eeprom_size <= self.flash_base)
    }
}

/// Policy hook for accepting or rejecting a staged update based on its
/// target hardware identifier (O3). The original bootloader never enforced
/// this (`true /* TODO hardware id match */`); the default implementation
/// preserves that behavior while leaving room for a deployment to tighten
/// it.
pub trait HwIdPolicy {
    fn accepts(&self, hwid: &Eui48) -> bool;
}

/// Default policy: accept any hardware identifier.
pub struct AcceptAll;

impl HwIdPolicy for AcceptAll {
    fn accepts(&self, _hwid: &Eui48) -> bool {
        true
    }
}
