// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The fixed memory geometry for this target, shared between the boot
//! sequence and the APT's `update` entry point.

use kestrel_core::layout::BootLayout;

use crate::boot_host::{EEPROM_BASE_ADDR, EEPROM_SIZE, FLASH_SIZE, FW_BASE_ADDR};

pub fn boot_layout() -> BootLayout {
    BootLayout::stm32l0(FLASH_SIZE, FW_BASE_ADDR, EEPROM_BASE_ADDR, EEPROM_SIZE)
}
