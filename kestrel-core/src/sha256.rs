// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SHA-256 engine (FIPS 180-4) used to identify delta blocks and to hash
//! staged update images before committing them.

use sha2::{Digest as _, Sha256};

use crate::data::Hash32;

/// Hash `msg` and return the eight big-endian output words.
pub fn hash(msg: &[u8]) -> Hash32 {
    let digest = Sha256::digest(msg);
    let mut words = [0u32; 8];
    for (w, chunk) in words.iter_mut().zip(digest.chunks_exact(4)) {
        *w = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    words
}

/// Incremental hasher, for hashing data that is assembled piecewise (e.g. a
/// header followed by a page-buffered payload).
pub struct Hasher {
    inner: Sha256,
}

impl Hasher {
    pub fn new() -> Self {
        Hasher {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Hash32 {
        let digest = self.inner.finalize();
        let mut words = [0u32; 8];
        for (w, chunk) in words.iter_mut().zip(digest.chunks_exact(4)) {
            *w = u32::from_be_bytes(chunk.try_into().unwrap());
        }
        words
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether `msg`'s hash matches `hash` in its first two words, the
/// same identity check the delta applier uses to decide whether a block is
/// already in place (see [`crate::apply::delta`]).
pub fn check_prefix(msg: &[u8], expected: &[u32; 2]) -> bool {
    let got = hash(msg);
    got[0] == expected[0] && got[1] == expected[1]
}
