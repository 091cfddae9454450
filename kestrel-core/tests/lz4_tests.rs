// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Integration tests for the LZ4 decompressor's dictionary/page-size
//! independence and back-reference resolution across all three zones.

use kestrel_core::sink::{HostFlash, PageSink};
use kestrel_core::BootResult;

struct MemFlash {
    locked: bool,
    image: Vec<u8>,
}

impl MemFlash {
    fn new(size: usize) -> Self {
        MemFlash {
            locked: true,
            image: vec![0u8; size],
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

fn token(lit: u8, mat: u8) -> u8 {
    (lit << 4) | mat
}

// A stream mixing literals and a self-overlapping match, decoded once per
// page size below; every decoding must produce the exact same plaintext.
fn sample_stream() -> Vec<u8> {
    let mut src = vec![token(4, 0)];
    src.extend_from_slice(b"abcd");
    // match length 6 (nibble 2 + minmatch 4) at offset 4: repeats "abcd" then "ab".
    src.push(token(0, 2));
    src.extend_from_slice(&4u16.to_le_bytes());
    src
}

fn decode_with_page<const N: usize>() -> Vec<u8> {
    let mut flash = MemFlash::new(N.max(256));
    let mut sink: PageSink<_, N> = PageSink::new(&mut flash, 0);
    let src = sample_stream();
    let n = kestrel_core::lz4::decompress(&src, &mut sink, &[]).unwrap();
    flash.image[0..n as usize].to_vec()
}

#[test]
fn test_decompression_is_page_size_independent() {
    let expected = b"abcdabcdab".to_vec();
    assert_eq!(decode_with_page::<64>(), expected);
    assert_eq!(decode_with_page::<128>(), expected);
    assert_eq!(decode_with_page::<256>(), expected);
    assert_eq!(decode_with_page::<4096>(), expected);
}

#[test]
fn test_match_spanning_a_page_boundary_reads_back_from_flash() {
    // Force a flush mid-stream with a tiny page so the match's source
    // bytes must come from already-written flash (zone 3), not the RAM
    // buffer (zone 1).
    let mut flash = MemFlash::new(256);
    let mut sink: PageSink<_, 4> = PageSink::new(&mut flash, 0);
    let src = sample_stream();
    let n = kestrel_core::lz4::decompress(&src, &mut sink, &[]).unwrap();
    assert_eq!(&flash.image[0..n as usize], b"abcdabcdab");
}

#[test]
fn test_dictionary_and_flash_zones_agree() {
    // Same logical back-reference distance (4 bytes before the cursor),
    // once satisfied from an external dictionary and once from flash
    // already written during this decompression -- both must resolve to
    // the same byte.
    let dict = b"wxyz";
    let mut flash_a = MemFlash::new(256);
    let mut sink_a: PageSink<_, 8> = PageSink::new(&mut flash_a, 0);
    // 0 literals, match length 4 at offset 4 against the dictionary.
    let src_a = [token(0, 0), 0x04, 0x00];
    kestrel_core::lz4::decompress(&src_a, &mut sink_a, dict).unwrap();

    let mut flash_b = MemFlash::new(256);
    let mut sink_b: PageSink<_, 8> = PageSink::new(&mut flash_b, 0);
    // 4 literals reproducing the dictionary tail, then the same match
    // against what is now already-written flash.
    let mut src_b = vec![token(4, 0)];
    src_b.extend_from_slice(dict);
    src_b.push(token(0, 0));
    src_b.extend_from_slice(&4u16.to_le_bytes());
    kestrel_core::lz4::decompress(&src_b, &mut sink_b, &[]).unwrap();

    assert_eq!(&flash_a.image[0..4], &flash_b.image[4..8]);
}
