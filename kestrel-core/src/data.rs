// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bit-exact wire layouts shared between the bootloader, packed update
//! images, and firmware images.
//!
//! Every type here is `#[repr(C)]` (or `#[repr(C, packed)]` where the source
//! layout is unaligned) with a compile-time size assertion, following the
//! same discipline as [`crate::apt::Apt`].

/// SHA-256 hash, stored as eight little-endian words (as produced by
/// [`crate::sha256`]).
pub type Hash32 = [u32; 8];

/// Hardware identifier (EUI-48), six raw bytes in native target byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Eui48(pub [u8; 6]);

const _: () = assert!(core::mem::size_of::<Eui48>() == 6);

impl Eui48 {
    pub const fn zero() -> Self {
        Eui48([0; 6])
    }

    /// Collapse to a single integer the way firmware compares hardware IDs:
    /// the first four bytes as the low word, the last two as the high
    /// half-word.
    pub fn as_u64(&self) -> u64 {
        let a = u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        let b = u16::from_le_bytes([self.0[4], self.0[5]]);
        ((b as u64) << 32) | (a as u64)
    }
}

/// Type of a firmware update image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateKind {
    /// Uncompressed firmware image.
    Plain = 0,
    /// LZ4-compressed, self-contained firmware image.
    Lz4 = 1,
    /// LZ4-compressed, block-delta update against the resident firmware.
    Lz4Delta = 2,
}

impl UpdateKind {
    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(UpdateKind::Plain),
            1 => Some(UpdateKind::Lz4),
            2 => Some(UpdateKind::Lz4Delta),
            _ => None,
        }
    }
}

/// Header prefixed to every resident firmware image (12 bytes).
///
/// Everything from `entrypoint` onward up to `size - 8` bytes is covered by
/// `crc`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FirmwareHeader {
    pub crc: u32,
    pub size: u32,
    pub entrypoint: u32,
}

const _: () = assert!(core::mem::size_of::<FirmwareHeader>() == 12);

impl FirmwareHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Read a header from a byte slice. Panics if `buf` is shorter than
    /// [`Self::SIZE`] (callers are expected to validate sizes up front).
    pub fn from_bytes(buf: &[u8]) -> Self {
        FirmwareHeader {
            crc: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            entrypoint: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
        }
    }
}

/// Header prefixed to every update image (24 bytes).
///
/// Everything from `fwcrc` onward up to `size - 8` bytes is covered by `crc`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct UpdateHeader {
    pub crc: u32,
    pub size: u32,
    pub fwcrc: u32,
    pub fwsize: u32,
    pub hwid: Eui48,
    pub uptype: u8,
    pub rfu: u8,
}

const _: () = assert!(core::mem::size_of::<UpdateHeader>() == 24);

impl UpdateHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_bytes(buf: &[u8]) -> Self {
        UpdateHeader {
            crc: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            fwcrc: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            fwsize: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            hwid: Eui48(buf[16..22].try_into().unwrap()),
            uptype: buf[22],
            rfu: buf[23],
        }
    }

    pub fn kind(&self) -> Option<UpdateKind> {
        UpdateKind::from_wire(self.uptype)
    }
}

/// Sub-header describing a block-delta update's block layout (12 bytes).
/// Immediately follows [`UpdateHeader`] when `uptype == Lz4Delta`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DeltaSubHeader {
    pub refcrc: u32,
    pub refsize: u32,
    pub blksize: u32,
}

const _: () = assert!(core::mem::size_of::<DeltaSubHeader>() == 12);

impl DeltaSubHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_bytes(buf: &[u8]) -> Self {
        DeltaSubHeader {
            refcrc: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            refsize: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            blksize: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
        }
    }
}

/// Header of a single delta block (14 bytes, packed; followed by
/// `lz4len` bytes of compressed payload, then padding to a 4-byte
/// boundary).
#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct DeltaBlockHeader {
    /// First two words of the target block's SHA-256 hash.
    pub hash: [u32; 2],
    pub blkidx: u8,
    pub dictidx: u8,
    pub dictlen: u16,
    pub lz4len: u16,
}

const _: () = assert!(core::mem::size_of::<DeltaBlockHeader>() == 14);

impl DeltaBlockHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_bytes(buf: &[u8]) -> Self {
        DeltaBlockHeader {
            hash: [
                u32::from_le_bytes(buf[0..4].try_into().unwrap()),
                u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            ],
            blkidx: buf[8],
            dictidx: buf[9],
            dictlen: u16::from_le_bytes(buf[10..12].try_into().unwrap()),
            lz4len: u16::from_le_bytes(buf[12..14].try_into().unwrap()),
        }
    }

    /// Total on-wire size of this block including payload, rounded up to a
    /// 4-byte boundary.
    pub fn advance(&self) -> usize {
        (Self::SIZE + self.lz4len as usize + 3) & !0x3
    }
}

/// Persisted bootloader configuration stored in EEPROM (64 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Pointer (flash address) to a staged update, written twice for
    /// atomic commit (see [`crate::boot`]).
    pub fwupdate1: u32,
    pub fwupdate2: u32,
    /// SHA-256 of the full staged update image, written before either
    /// `fwupdate` pointer.
    pub hash: Hash32,
    pub rfu: [u8; 24],
}

const _: () = assert!(core::mem::size_of::<Config>() == 64);

impl Config {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub const fn empty() -> Self {
        Config {
            fwupdate1: 0,
            fwupdate2: 0,
            hash: [0; 8],
            rfu: [0; 24],
        }
    }

    /// True when both update pointers agree, i.e. the commit handshake
    /// completed (invariant I1).
    pub fn is_committed(&self) -> bool {
        self.fwupdate1 == self.fwupdate2
    }
}
