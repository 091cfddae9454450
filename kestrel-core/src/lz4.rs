// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Streaming LZ4 block decompressor with page-buffered flash output.
//!
//! This decodes the raw LZ4 block format (no frame header, no checksums):
//! a token byte whose high nibble is a literal-length code and low nibble a
//! match-length code, each extendable by a run of `0xFF` continuation
//! bytes, followed by a 16-bit little-endian match offset. Minimum match
//! length is 4.
//!
//! Back-references may resolve against three zones, handled by
//! [`crate::sink::PageSink::push_ref`]: the in-progress page buffer, an
//! external dictionary supplied by the caller (used by the block-delta
//! applier), or flash pages already flushed during this same
//! decompression. The final partial page is padded with `0xFF`.

use crate::error::{BootError, BootResult};
use crate::sink::{HostFlash, PageSink};

const MIN_MATCH: u32 = 4;

/// Decompress `src` into `sink`, optionally resolving back-references
/// against `dict` (pass an empty slice when there is no dictionary).
/// Returns the number of decompressed bytes, not counting the trailing
/// pad inserted to reach a full page.
pub fn decompress<F: HostFlash, const N: usize>(
    src: &[u8],
    sink: &mut PageSink<F, N>,
    dict: &[u8],
) -> BootResult<u32> {
    let mut pos = 0usize;
    let start = sink.bytes_written();

    while pos < src.len() {
        let token = src[pos];
        pos += 1;

        let mut lit_len = (token >> 4) as u32;
        if lit_len == 15 {
            loop {
                let b = *src.get(pos).ok_or(BootError::General)?;
                pos += 1;
                lit_len += b as u32;
                if b != 255 {
                    break;
                }
            }
        }

        for _ in 0..lit_len {
            let b = *src.get(pos).ok_or(BootError::General)?;
            pos += 1;
            sink.push(b)?;
        }

        if pos >= src.len() {
            // Last sequence is incomplete and stops after the literals.
            break;
        }

        let lo = *src.get(pos).ok_or(BootError::General)? as u32;
        pos += 1;
        let hi = *src.get(pos).ok_or(BootError::General)? as u32;
        pos += 1;
        let offset = (hi << 8) | lo;
        if offset == 0 {
            return Err(BootError::General);
        }

        let mut match_len = (token & 0x0F) as u32;
        if match_len == 15 {
            loop {
                let b = *src.get(pos).ok_or(BootError::General)?;
                pos += 1;
                match_len += b as u32;
                if b != 255 {
                    break;
                }
            }
        }
        match_len += MIN_MATCH;

        for _ in 0..match_len {
            sink.push_ref(offset, dict)?;
        }
    }

    sink.pad_and_flush(0xFF)?;
    Ok(sink.bytes_written() - start)
}
