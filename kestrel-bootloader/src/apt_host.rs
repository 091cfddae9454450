// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The concrete [`Apt`] instance handed to firmware at entry. Each function
//! pointer is a thin `extern "C"` wrapper around the matching
//! [`kestrel_core`] algorithm; none of them carry state of their own since
//! [`Stm32l0Host`] is a unit struct.

use kestrel_core::apt::{Apt, APT_VERSION};
use kestrel_core::boot::{self, BootHost};
use kestrel_core::data::Hash32;
use kestrel_core::error::{PanicReason, PanicType};
use kestrel_core::{crc32, sha256};

use crate::boot_host::Stm32l0Host;
use crate::flash;
use crate::layout::boot_layout;
use crate::panic::raw_panic;
use crate::{BLK, PAGE};

extern "C" fn apt_panic(reason: u32, addr: u32) -> ! {
    raw_panic(PanicType::Firmware.to_wire(), reason, addr)
}

extern "C" fn apt_update(ptr: *const u8, hash: *const Hash32) -> u32 {
    let layout = boot_layout();
    let mut host = Stm32l0Host;
    let hash_ref = if hash.is_null() {
        None
    } else {
        Some(unsafe { &*hash })
    };
    match boot::set_update::<Stm32l0Host, PAGE, BLK>(&mut host, &layout, ptr as u32, hash_ref) {
        Ok(()) => 0,
        Err(e) => e.to_wire(),
    }
}

extern "C" fn apt_crc32(buf: *const u8, nbytes: u32) -> u32 {
    let slice = unsafe { core::slice::from_raw_parts(buf, nbytes as usize) };
    crc32::checksum(slice)
}

extern "C" fn apt_wr_flash(dst: *mut u32, src: *const u32, nwords: u32, erase: bool) {
    flash::unlock();
    if erase || !src.is_null() {
        let page = if src.is_null() {
            [0u8; crate::FLASH_PAGE_SIZE]
        } else {
            let mut buf = [0u8; crate::FLASH_PAGE_SIZE];
            let words = unsafe { core::slice::from_raw_parts(src, nwords as usize) };
            for (chunk, w) in buf.chunks_exact_mut(4).zip(words.iter()) {
                chunk.copy_from_slice(&w.to_le_bytes());
            }
            buf
        };
        // An absent end-of-program flag means the hardware itself failed the
        // write; this is fatal, same as any other genuine flash failure.
        if unsafe { flash::write_page(dst, &page) }.is_err() {
            let mut host = Stm32l0Host;
            host.panic(PanicType::Firmware, PanicReason::Flash, dst as u32);
        }
    }
    flash::lock();
}

extern "C" fn apt_sha256(hash: *mut Hash32, msg: *const u8, len: u32) {
    let slice = unsafe { core::slice::from_raw_parts(msg, len as usize) };
    let digest = sha256::hash(slice);
    unsafe { core::ptr::write(hash, digest) };
}

/// Build the APT handed to firmware at entry. Every call site gets a fresh
/// instance; all the functions behind it are stateless.
pub fn build() -> Apt {
    Apt {
        version: APT_VERSION,
        panic: apt_panic,
        update: apt_update,
        crc32: apt_crc32,
        wr_flash: apt_wr_flash,
        sha256: apt_sha256,
    }
}
