// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! High-compression LZ4 block encoding, used to build update images the
//! bootloader's streaming decompressor can consume. Mirrors
//! `lz4_compress()`'s use of the HC streaming API (`LZ4_createStreamHC` /
//! `LZ4_loadDictHC` / `LZ4_compress_HC_continue`) so a block compressed
//! against a dictionary decompresses correctly against that same
//! dictionary on the device.

use anyhow::{anyhow, Result};
use libc::c_int;
use lz4_sys::{
    LZ4_compress_HC_continue, LZ4_createStreamHC, LZ4_freeStreamHC, LZ4_loadDictHC, LZ4HC_CLEVEL_MAX,
};

/// Compress `src` with an optional leading `dict`, returning the raw LZ4
/// block stream (no frame header) the device's `lz4::decompress` expects.
pub fn compress(src: &[u8], dict: &[u8]) -> Result<Vec<u8>> {
    unsafe {
        let stream = LZ4_createStreamHC();
        if stream.is_null() {
            return Err(anyhow!("LZ4_createStreamHC failed"));
        }

        if !dict.is_empty() {
            LZ4_loadDictHC(stream, dict.as_ptr() as *const i8, dict.len() as c_int);
        }

        // Worst case, an incompressible block expands slightly; give LZ4
        // comfortable headroom and truncate to the real length afterward.
        let cap = src.len() + src.len() / 255 + 16;
        let mut dst = vec![0u8; cap];

        let n = LZ4_compress_HC_continue(
            stream,
            src.as_ptr() as *const i8,
            dst.as_mut_ptr() as *mut i8,
            src.len() as c_int,
            cap as c_int,
        );

        LZ4_freeStreamHC(stream);

        if n <= 0 {
            return Err(anyhow!("LZ4 compression failed"));
        }
        dst.truncate(n as usize);
        Ok(dst)
    }
}

#[allow(dead_code)]
pub const MAX_LEVEL: i32 = LZ4HC_CLEVEL_MAX as i32;
