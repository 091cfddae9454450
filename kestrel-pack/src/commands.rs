// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Builds the three update image flavors the bootloader's applier
//! understands, grounded on `kestrel_core::apply`'s exact byte layouts so
//! an image built here installs without surprises on the device.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use kestrel_core::data::{DeltaBlockHeader, DeltaSubHeader, Eui48, UpdateHeader, UpdateKind};
use kestrel_core::{crc32, sha256};

use crate::lz4_hc;

fn round_up(n: usize, page: usize) -> usize {
    (n + page - 1) / page * page
}

fn pad_to_page(mut fw: Vec<u8>, page: usize) -> Vec<u8> {
    let target = round_up(fw.len(), page);
    fw.resize(target, 0xFF);
    fw
}

/// Build the 24-byte header covering everything after `fwcrc`/`fwsize`
/// onward -- the CRC itself is filled in by the caller once the body is
/// known.
fn update_header(fwsize: u32, fwcrc: u32, hwid: Eui48, uptype: UpdateKind, body_len: usize) -> Vec<u8> {
    let mut hdr = vec![0u8; UpdateHeader::SIZE];
    hdr[4..8].copy_from_slice(&((UpdateHeader::SIZE + body_len) as u32).to_le_bytes());
    hdr[8..12].copy_from_slice(&fwcrc.to_le_bytes());
    hdr[12..16].copy_from_slice(&fwsize.to_le_bytes());
    hdr[16..22].copy_from_slice(&hwid.0);
    hdr[22] = uptype as u8;
    hdr[23] = 0;
    hdr
}

fn finalize(mut hdr: Vec<u8>, body: &[u8]) -> Vec<u8> {
    let mut covered = hdr[8..].to_vec();
    covered.extend_from_slice(body);
    let crc = crc32::checksum(&covered);
    hdr[0..4].copy_from_slice(&crc.to_le_bytes());
    hdr.extend_from_slice(body);
    hdr
}

/// Pack a plain (uncompressed) update image.
pub fn pack_plain(firmware: &Path, page_size: usize, hwid: Eui48, out: &Path) -> Result<()> {
    let raw = fs::read(firmware).with_context(|| format!("failed to read {}", firmware.display()))?;
    let fw = pad_to_page(raw, page_size);
    let fwcrc = crc32::checksum(&fw);
    let hdr = update_header(fw.len() as u32, fwcrc, hwid, UpdateKind::Plain, fw.len());
    let image = finalize(hdr, &fw);
    fs::write(out, &image).with_context(|| format!("failed to write {}", out.display()))?;
    println!("plain update: {} bytes -> {}", image.len(), out.display());
    Ok(())
}

/// Pack a self-contained LZ4-compressed update image.
pub fn pack_lz4(firmware: &Path, page_size: usize, hwid: Eui48, out: &Path) -> Result<()> {
    let raw = fs::read(firmware).with_context(|| format!("failed to read {}", firmware.display()))?;
    let fw = pad_to_page(raw, page_size);
    let fwcrc = crc32::checksum(&fw);

    let compressed = lz4_hc::compress(&fw, &[])?;

    // word-align the body; the last byte records how much padding was added
    // so the applier can strip it before treating the rest as the lz4 stream.
    let mut body = compressed;
    let pad = (4 - (body.len() + 1) % 4) % 4;
    for _ in 0..pad {
        body.push(0);
    }
    body.push(pad as u8);

    let hdr = update_header(fw.len() as u32, fwcrc, hwid, UpdateKind::Lz4, body.len());
    let image = finalize(hdr, &body);
    fs::write(out, &image).with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "lz4 update: {} bytes ({} compressed) -> {}",
        image.len(),
        image.len() - UpdateHeader::SIZE,
        out.display()
    );
    Ok(())
}

/// Pack an LZ4 block-delta update against `reference` (the firmware image
/// currently expected to be resident on the device).
pub fn pack_delta(firmware: &Path, reference: &Path, blksize: usize, hwid: Eui48, out: &Path) -> Result<()> {
    let new_raw = fs::read(firmware).with_context(|| format!("failed to read {}", firmware.display()))?;
    let ref_raw =
        fs::read(reference).with_context(|| format!("failed to read {}", reference.display()))?;

    let new_fw = pad_to_page(new_raw, blksize);
    let ref_fw = pad_to_page(ref_raw, blksize);

    if ref_fw.len() % blksize != 0 {
        bail!("reference firmware is not a multiple of the block size");
    }

    let fwcrc = crc32::checksum(&new_fw);
    let refcrc = crc32::checksum(&ref_fw);

    let mut dhdr = vec![0u8; DeltaSubHeader::SIZE];
    dhdr[0..4].copy_from_slice(&refcrc.to_le_bytes());
    dhdr[4..8].copy_from_slice(&(ref_fw.len() as u32).to_le_bytes());
    dhdr[8..12].copy_from_slice(&(blksize as u32).to_le_bytes());

    let nblocks = new_fw.len() / blksize;
    let pb = ProgressBar::new(nblocks as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40.cyan/blue} block {pos}/{len}")?);

    let mut blocks = Vec::new();
    for idx in 0..nblocks {
        let block = &new_fw[idx * blksize..(idx + 1) * blksize];

        // Best dictionary candidate: the same-index block in the reference
        // image. A real packer would search nearby blocks too; this mirrors
        // `original_source`'s single-candidate-per-block delta scheme.
        let dictidx = idx.min(ref_fw.len() / blksize - 1);
        let dict = &ref_fw[dictidx * blksize..(dictidx + 1) * blksize];

        if block == dict {
            // Already present on the device unchanged; still emit a block
            // so the block index stays contiguous, but with a trivial
            // zero-length payload matched against itself.
            blocks.push(encode_block(idx as u8, dictidx as u8, 0, &[], block));
        } else {
            let compressed = lz4_hc::compress(block, dict)?;
            blocks.push(encode_block(idx as u8, dictidx as u8, dict.len() as u16, &compressed, block));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let mut body = dhdr;
    for b in &blocks {
        body.extend_from_slice(b);
    }

    let hdr = update_header(new_fw.len() as u32, fwcrc, hwid, UpdateKind::Lz4Delta, body.len());
    let image = finalize(hdr, &body);
    fs::write(out, &image).with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "delta update: {} blocks, {} bytes -> {}",
        nblocks,
        image.len(),
        out.display()
    );
    Ok(())
}

fn encode_block(blkidx: u8, dictidx: u8, dictlen: u16, lz4data: &[u8], plain_block: &[u8]) -> Vec<u8> {
    let hash = sha256::hash(plain_block);
    let mut buf = vec![0u8; DeltaBlockHeader::SIZE];
    buf[0..4].copy_from_slice(&hash[0].to_le_bytes());
    buf[4..8].copy_from_slice(&hash[1].to_le_bytes());
    buf[8] = blkidx;
    buf[9] = dictidx;
    buf[10..12].copy_from_slice(&dictlen.to_le_bytes());
    buf[12..14].copy_from_slice(&(lz4data.len() as u16).to_le_bytes());
    buf.extend_from_slice(lz4data);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
    buf
}
