// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash write sink: the host hook trait and the page-buffered writer that
//! sits between the update applier / LZ4 decompressor and real flash.

use crate::error::{BootError, BootResult};

/// Host-supplied flash access. Implemented once per target (real flash on
/// the device, an in-memory byte vector in tests).
pub trait HostFlash {
    /// Unlock flash for writing. Called once before a batch of page writes;
    /// paired with [`HostFlash::lock`].
    fn unlock(&mut self);

    /// Relock flash. Always called after a matching `unlock`, including on
    /// early-return error paths (see [`FlashGuard`]).
    fn lock(&mut self);

    /// Erase-and-write one page at byte offset `dst_offset` (relative to
    /// flash base) with the contents of `page`. `page.len()` is always
    /// exactly the target's page size.
    fn write_page(&mut self, dst_offset: u32, page: &[u8]) -> BootResult<()>;

    /// Read already-written flash at byte offset `offset` (relative to
    /// flash base) into `buf`. Flash is execute-in-place memory on the
    /// real target, so this is a plain memory read there; the host test
    /// double backs it with a byte vector.
    fn read(&self, offset: u32, buf: &mut [u8]);
}

/// RAII guard around [`HostFlash::unlock`]/[`HostFlash::lock`] so every
/// early return -- including ones driven by `?` -- still relocks flash.
pub struct FlashGuard<'a, F: HostFlash> {
    flash: &'a mut F,
}

impl<'a, F: HostFlash> FlashGuard<'a, F> {
    pub fn new(flash: &'a mut F) -> Self {
        flash.unlock();
        FlashGuard { flash }
    }

    pub fn flash(&mut self) -> &mut F {
        self.flash
    }
}

impl<'a, F: HostFlash> Drop for FlashGuard<'a, F> {
    fn drop(&mut self) {
        self.flash.lock();
    }
}

/// Page-buffered writer: accumulates bytes written at sequential
/// destination offsets and flushes a full page to [`HostFlash`] whenever
/// the buffer fills, zero-padding the final partial page the same way
/// `flashcopy` does for plain updates.
///
/// `N` must equal the target's flash page size.
pub struct PageSink<'a, F: HostFlash, const N: usize> {
    flash: &'a mut F,
    dst_base: u32,
    buf: [u8; N],
    pos_in_page: usize,
    written: u32,
}

impl<'a, F: HostFlash, const N: usize> PageSink<'a, F, N> {
    pub fn new(flash: &'a mut F, dst_base: u32) -> Self {
        PageSink {
            flash,
            dst_base,
            buf: [0u8; N],
            pos_in_page: 0,
            written: 0,
        }
    }

    pub fn bytes_written(&self) -> u32 {
        self.written
    }

    /// Append one byte, flushing a page to flash whenever the buffer fills.
    pub fn push(&mut self, byte: u8) -> BootResult<()> {
        self.buf[self.pos_in_page] = byte;
        self.pos_in_page += 1;
        self.written += 1;
        if self.pos_in_page == N {
            self.flush_page()?;
        }
        Ok(())
    }

    pub fn push_slice(&mut self, data: &[u8]) -> BootResult<()> {
        for &b in data {
            self.push(b)?;
        }
        Ok(())
    }

    /// Resolve a back-reference `offset` bytes behind the byte about to be
    /// written, then push the resolved byte. Mirrors the three-zone lookup
    /// the original `putbyte` performs: the current page buffer, an
    /// external dictionary (indexed from its end), or already-flushed
    /// flash.
    pub fn push_ref(&mut self, offset: u32, dict: &[u8]) -> BootResult<()> {
        let byte = self.resolve_ref(offset, dict)?;
        self.push(byte)
    }

    fn resolve_ref(&self, offset: u32, dict: &[u8]) -> BootResult<u8> {
        let offset = offset as i64;
        let pageoff = self.pos_in_page as i64;
        if pageoff - offset >= 0 {
            // Zone 1: still within the current, unflushed page buffer.
            Ok(self.buf[(pageoff - offset) as usize])
        } else {
            let dstlen = self.written as i64;
            if dstlen - offset < 0 {
                // Zone 2: before the start of this decompression's output,
                // in the caller-supplied dictionary, indexed from its end.
                let idx = dict.len() as i64 + (dstlen - offset);
                if idx < 0 {
                    // Dictionary underrun: the offset reaches further back
                    // than the dictionary can supply.
                    return Err(BootError::General);
                }
                Ok(dict[idx as usize])
            } else {
                // Zone 3: an earlier page already flushed to flash.
                let mut b = [0u8; 1];
                self.flash.read(
                    (self.dst_base as i64 + dstlen - offset) as u32,
                    &mut b,
                );
                Ok(b[0])
            }
        }
    }

    /// Pad the in-progress page to a full page with `pad` and flush it.
    /// No-op if the buffer is already empty (page-aligned).
    pub fn pad_and_flush(&mut self, pad: u8) -> BootResult<()> {
        if self.pos_in_page == 0 {
            return Ok(());
        }
        while self.pos_in_page < N {
            self.buf[self.pos_in_page] = pad;
            self.pos_in_page += 1;
        }
        self.flush_page()
    }

    fn flush_page(&mut self) -> BootResult<()> {
        let page_index = self.written.div_ceil(N as u32) - 1;
        let dst = self.dst_base + page_index * N as u32;
        self.flash.write_page(dst, &self.buf)?;
        self.pos_in_page = 0;
        Ok(())
    }
}
