// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CRC-32 engine used for both firmware and update image integrity checks.
//!
//! Reflected, polynomial `0xEDB88320`, init `0xFFFFFFFF`, final XOR
//! `0xFFFFFFFF` - the same algorithm the original bootloader's hardware CRC
//! peripheral and software fallback both implement.

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the CRC-32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Incremental digest, for computing a CRC across non-contiguous regions
/// (e.g. a header followed by a decompressed payload) without buffering
/// them together first.
pub struct Digest {
    inner: crc::Digest<'static, u32>,
}

impl Digest {
    pub fn new() -> Self {
        Digest {
            inner: CRC32.digest(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> u32 {
        self.inner.finalize()
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::new()
    }
}
