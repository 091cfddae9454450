// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The Application Programming Table (APT): the versioned capability object
//! the bootloader hands to firmware at entry, giving it access to update
//! staging, CRC/SHA-256, flash writes, and the panic channel without
//! exposing any bootloader internals.
//!
//! Fields are only ever appended; a firmware image built against an older
//! `Apt` still finds every field it was compiled against at the same
//! offset.

use crate::data::Hash32;

/// Current APT version. History, oldest first:
///
///   0x100 - initial version (update, panic, crc32)
///   0x101 - added wr_flash
///   0x102 - added sha256
///   0x103 - support for self-contained LZ4 updates
///   0x104 - support for LZ4 block-delta updates
///   0x105 - wr_flash: allow erase-only operation by passing src=None
pub const APT_VERSION: u32 = 0x105;

/// Function-pointer capability table exposed to firmware.
#[repr(C)]
pub struct Apt {
    pub version: u32,
    pub panic: extern "C" fn(reason: u32, addr: u32) -> !,
    pub update: extern "C" fn(ptr: *const u8, hash: *const Hash32) -> u32,
    pub crc32: extern "C" fn(buf: *const u8, nbytes: u32) -> u32,
    pub wr_flash: extern "C" fn(dst: *mut u32, src: *const u32, nwords: u32, erase: bool),
    pub sha256: extern "C" fn(hash: *mut Hash32, msg: *const u8, len: u32),
}
