// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Installs a staged update image onto the resident firmware region.
//!
//! Three update kinds are supported, dispatched on [`crate::data::UpdateKind`]:
//! a plain uncompressed copy, a self-contained LZ4-compressed image, and an
//! LZ4 block-delta against the firmware already in flash. All three share
//! the same size-checked installation address and go through
//! [`crate::sink::PageSink`] for the actual flash writes.
//!
//! Callers pass `install = false` to run every check without touching flash
//! -- used to validate a staged update before committing to it.

use crate::data::{DeltaBlockHeader, DeltaSubHeader, FirmwareHeader, UpdateHeader, UpdateKind};
use crate::error::{BootError, BootResult};
use crate::layout::BootLayout;
use crate::lz4;
use crate::sha256;
use crate::sink::{FlashGuard, HostFlash, PageSink};

/// Validate the installation address and, when a delta update also needs
/// scratch space, that the combined footprint still fits before the staged
/// update image. Mirrors the original size checks: new firmware must be a
/// whole number of flash pages and must not grow into the update image
/// itself.
fn install_init<F: HostFlash>(
    flash: &F,
    layout: &BootLayout,
    update_ptr: u32,
    fwsize: u32,
    tmpsize: u32,
) -> BootResult<u32> {
    let room = layout.room_before(update_ptr);
    if !layout.is_page_multiple(fwsize) || fwsize > room {
        return Err(BootError::Size);
    }
    if tmpsize > 0 {
        if !layout.is_page_multiple(tmpsize) {
            return Err(BootError::Size);
        }
        let mut buf = [0u8; FirmwareHeader::SIZE];
        flash.read(layout.fw_base - layout.flash_base, &mut buf);
        let resident = FirmwareHeader::from_bytes(&buf);
        let fwmax = fwsize.max(resident.size);
        if fwmax + tmpsize > room {
            return Err(BootError::Size);
        }
    }
    Ok(layout.fw_base - layout.flash_base)
}

/// Apply a staged update image. `update_ptr` is the flash offset (relative
/// to `layout.flash_base`) at which `update` is staged; `update` is the raw
/// bytes of the staged image starting at its [`UpdateHeader`].
///
/// `PAGE` must equal the target's flash page size; `BLK` must equal the
/// delta block size named in the update's [`DeltaSubHeader`] when the
/// update is a block-delta (checked at runtime, ignored otherwise).
pub fn apply<F: HostFlash, const PAGE: usize, const BLK: usize>(
    flash: &mut F,
    layout: &BootLayout,
    update_ptr: u32,
    update: &[u8],
    install: bool,
) -> BootResult<()> {
    if update.len() < UpdateHeader::SIZE {
        return Err(BootError::Size);
    }
    let hdr = UpdateHeader::from_bytes(update);
    match hdr.kind() {
        Some(UpdateKind::Plain) => apply_plain::<F, PAGE>(flash, layout, update_ptr, &hdr, update, install),
        Some(UpdateKind::Lz4) => apply_lz4::<F, PAGE>(flash, layout, update_ptr, &hdr, update, install),
        Some(UpdateKind::Lz4Delta) => {
            apply_delta::<F, PAGE, BLK>(flash, layout, update_ptr, &hdr, update, install)
        }
        None => Err(BootError::NoImpl),
    }
}

fn apply_plain<F: HostFlash, const PAGE: usize>(
    flash: &mut F,
    layout: &BootLayout,
    update_ptr: u32,
    hdr: &UpdateHeader,
    update: &[u8],
    install: bool,
) -> BootResult<()> {
    let dst = install_init(flash, layout, update_ptr, hdr.fwsize, 0)?;
    if install {
        let payload = &update[UpdateHeader::SIZE..UpdateHeader::SIZE + hdr.fwsize as usize];
        let mut guard = FlashGuard::new(flash);
        let mut sink: PageSink<F, PAGE> = PageSink::new(guard.flash(), dst);
        sink.push_slice(payload)?;
        sink.pad_and_flush(0)?;
    }
    Ok(())
}

fn apply_lz4<F: HostFlash, const PAGE: usize>(
    flash: &mut F,
    layout: &BootLayout,
    update_ptr: u32,
    hdr: &UpdateHeader,
    update: &[u8],
    install: bool,
) -> BootResult<()> {
    let dst = install_init(flash, layout, update_ptr, hdr.fwsize, 0)?;
    if install {
        let src = &update[UpdateHeader::SIZE..];
        // the final byte holds the number of alignment padding bytes appended
        // to the compressed stream.
        let pad = *src.last().ok_or(BootError::Size)? as usize;
        let lz4len = src.len().checked_sub(pad).ok_or(BootError::Size)?;
        let mut guard = FlashGuard::new(flash);
        let mut sink: PageSink<F, PAGE> = PageSink::new(guard.flash(), dst);
        lz4::decompress(&src[..lz4len], &mut sink, &[])?;
    }
    Ok(())
}

fn apply_delta<F: HostFlash, const PAGE: usize, const BLK: usize>(
    flash: &mut F,
    layout: &BootLayout,
    update_ptr: u32,
    hdr: &UpdateHeader,
    update: &[u8],
    install: bool,
) -> BootResult<()> {
    let dhdr_off = UpdateHeader::SIZE;
    let dhdr = DeltaSubHeader::from_bytes(&update[dhdr_off..]);
    if dhdr.blksize as usize != BLK {
        return Err(BootError::Size);
    }

    let dst = install_init(flash, layout, update_ptr, hdr.fwsize, dhdr.blksize)?;
    let tmp_ptr = update_ptr - dhdr.blksize;

    let mut fwhdr_buf = [0u8; FirmwareHeader::SIZE];
    flash.read(layout.fw_base - layout.flash_base, &mut fwhdr_buf);
    let resident = FirmwareHeader::from_bytes(&fwhdr_buf);

    // Before installing, the reference the delta was built against must
    // still match the resident firmware -- it is about to be overwritten.
    if !install && (dhdr.refcrc != resident.crc || dhdr.refsize != resident.size) {
        return Err(BootError::General);
    }

    let mut pos = dhdr_off + DeltaSubHeader::SIZE;
    let end = update.len();

    while pos < end {
        let blk = DeltaBlockHeader::from_bytes(&update[pos..]);
        let boff = blk.blkidx as u32 * dhdr.blksize;
        let doff = blk.dictidx as u32 * dhdr.blksize;
        if boff > hdr.fwsize || doff + blk.dictlen as u32 > dhdr.refsize {
            return Err(BootError::Size);
        }
        let baddr = dst + boff;
        // last block may be shorter than a full block.
        let bsz = core::cmp::min(dhdr.blksize, hdr.fwsize - boff) as usize;

        if install {
            let payload_off = pos + DeltaBlockHeader::SIZE;
            let payload = &update[payload_off..payload_off + blk.lz4len as usize];

            let mut buf = [0u8; BLK];
            flash.read(baddr, &mut buf[..bsz]);
            let already_installed = sha256::check_prefix(&buf[..bsz], &blk.hash);

            if !already_installed {
                let mut guard = FlashGuard::new(flash);

                guard.flash().read(tmp_ptr, &mut buf[..bsz]);
                let scratch_ready = sha256::check_prefix(&buf[..bsz], &blk.hash);

                if !scratch_ready {
                    let mut dict = [0u8; BLK];
                    let dict_len = blk.dictlen as usize;
                    guard
                        .flash()
                        .read(layout.fw_base - layout.flash_base + doff, &mut dict[..dict_len]);

                    let mut sink: PageSink<F, PAGE> = PageSink::new(guard.flash(), tmp_ptr);
                    let n = lz4::decompress(payload, &mut sink, &dict[..dict_len])?;
                    if n as usize != bsz {
                        return Err(BootError::General);
                    }

                    guard.flash().read(tmp_ptr, &mut buf[..bsz]);
                    if !sha256::check_prefix(&buf[..bsz], &blk.hash) {
                        return Err(BootError::General);
                    }
                }

                let mut sink: PageSink<F, PAGE> = PageSink::new(guard.flash(), baddr);
                sink.push_slice(&buf[..bsz])?;
                sink.pad_and_flush(0)?;
            }
        }

        pos += blk.advance();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    const PAGE: usize = 8;
    const FLASH_SIZE: usize = 4096;

    struct MemFlash {
        locked: bool,
        image: Vec<u8>,
    }

    impl MemFlash {
        fn new() -> Self {
            MemFlash {
                locked: true,
                image: vec![0u8; FLASH_SIZE],
            }
        }
    }

    impl HostFlash for MemFlash {
        fn unlock(&mut self) {
            self.locked = false;
        }
        fn lock(&mut self) {
            self.locked = true;
        }
        fn write_page(&mut self, dst_offset: u32, page: &[u8]) -> BootResult<()> {
            assert!(!self.locked);
            let off = dst_offset as usize;
            self.image[off..off + page.len()].copy_from_slice(page);
            Ok(())
        }
        fn read(&self, offset: u32, buf: &mut [u8]) {
            let off = offset as usize;
            buf.copy_from_slice(&self.image[off..off + buf.len()]);
        }
    }

    fn layout() -> BootLayout {
        BootLayout {
            flash_base: 0,
            flash_size: FLASH_SIZE as u32,
            fw_base: 0x100,
            eeprom_base: 0xF00,
            eeprom_size: 0x40,
            flash_page_size: PAGE as u32,
        }
    }

    fn update_header(fwsize: u32, uptype: u8, size: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; UpdateHeader::SIZE];
        bytes[4..8].copy_from_slice(&size.to_le_bytes());
        bytes[12..16].copy_from_slice(&fwsize.to_le_bytes());
        bytes[22] = uptype;
        bytes
    }

    #[test]
    fn apply_plain_writes_firmware_image() {
        let mut flash = MemFlash::new();
        let l = layout();
        let mut update = update_header(16, 0, 0);
        update.extend_from_slice(&[0xAB; 16]);

        apply::<MemFlash, PAGE, PAGE>(&mut flash, &l, 0x800, &update, true).unwrap();
        assert_eq!(&flash.image[0x100..0x110], &[0xAB; 16]);
    }

    #[test]
    fn apply_plain_rejects_unaligned_size() {
        let mut flash = MemFlash::new();
        let l = layout();
        let mut update = update_header(15, 0, 0);
        update.extend_from_slice(&[0xAB; 15]);

        let err = apply::<MemFlash, PAGE, PAGE>(&mut flash, &l, 0x800, &update, true).unwrap_err();
        assert_eq!(err, BootError::Size);
    }

    #[test]
    fn apply_lz4_self_contained_decompresses() {
        let mut flash = MemFlash::new();
        let l = layout();
        // token with 8 literal bytes, no match: 9 bytes of real lz4 data,
        // padded out to a 4-byte boundary with the pad count (including
        // itself) stored in the final byte.
        let mut payload = vec![(8u8 << 4) | 0];
        payload.extend_from_slice(b"deadbeef");
        while payload.len() % 4 != 0 {
            payload.push(0);
        }
        let pad = payload.len() - 9;
        *payload.last_mut().unwrap() = pad as u8;

        let mut update = update_header(8, 1, 0);
        update.extend_from_slice(&payload);

        apply::<MemFlash, PAGE, PAGE>(&mut flash, &l, 0x800, &update, true).unwrap();
        assert_eq!(&flash.image[0x100..0x108], b"deadbeef");
    }

    #[test]
    fn apply_delta_skips_block_already_in_place() {
        let mut flash = MemFlash::new();
        let l = layout();
        // first 8 bytes double as the resident FirmwareHeader's crc/size
        // fields (size = 8) and as block 0's hashed content.
        let original: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x08, 0x00, 0x00, 0x00];
        flash.image[0x100..0x108].copy_from_slice(&original);
        let target_hash = sha256::hash(&original);

        let mut dhdr = vec![0u8; DeltaSubHeader::SIZE];
        dhdr[8..12].copy_from_slice(&(PAGE as u32).to_le_bytes());

        let mut blk = vec![0u8; DeltaBlockHeader::SIZE];
        blk[0..4].copy_from_slice(&target_hash[0].to_le_bytes());
        blk[4..8].copy_from_slice(&target_hash[1].to_le_bytes());
        // blkidx = 0, dictidx = 0, dictlen = 0, lz4len = 0

        let body_size = (dhdr.len() + blk.len() + 3) & !0x3;
        let mut update = update_header(8, 2, 0);
        update.extend_from_slice(&dhdr);
        update.extend_from_slice(&blk);
        update.resize(UpdateHeader::SIZE + body_size, 0);

        apply::<MemFlash, PAGE, PAGE>(&mut flash, &l, 0x800, &update, true).unwrap();
        // target already matched the block hash, so the bytes are untouched.
        assert_eq!(&flash.image[0x100..0x108], &original);
    }

    #[test]
    fn apply_delta_decompresses_missing_block() {
        let mut flash = MemFlash::new();
        let l = layout();
        // resident header: crc = junk, size = 8.
        let original: [u8; 8] = [0xAA, 0xBB, 0xCC, 0xDD, 0x08, 0x00, 0x00, 0x00];
        flash.image[0x100..0x108].copy_from_slice(&original);

        let new_block = b"replaced";
        let target_hash = sha256::hash(new_block);

        let mut dhdr = vec![0u8; DeltaSubHeader::SIZE];
        dhdr[8..12].copy_from_slice(&(PAGE as u32).to_le_bytes());

        // literal-only LZ4 payload reproducing "replaced".
        let mut lz4data = vec![(8u8 << 4) | 0];
        lz4data.extend_from_slice(new_block);

        let mut blk = vec![0u8; DeltaBlockHeader::SIZE];
        blk[0..4].copy_from_slice(&target_hash[0].to_le_bytes());
        blk[4..8].copy_from_slice(&target_hash[1].to_le_bytes());
        blk[12..14].copy_from_slice(&(lz4data.len() as u16).to_le_bytes());
        blk.extend_from_slice(&lz4data);
        while blk.len() % 4 != 0 {
            blk.push(0);
        }

        let mut update = update_header(8, 2, 0);
        update.extend_from_slice(&dhdr);
        update.extend_from_slice(&blk);

        apply::<MemFlash, PAGE, PAGE>(&mut flash, &l, 0x800, &update, true).unwrap();
        assert_eq!(&flash.image[0x100..0x108], new_block);
    }
}
