// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and algorithms shared by the bootloader and firmware:
//! wire layouts, the CRC-32/SHA-256 engines, the LZ4 decompressor, the
//! update applier, and the boot sequence itself.
//!
//! This crate supports both `no_std` (the bootloader/firmware targets) and
//! `std` (host tooling and tests):
//! - Default: `no_std`
//! - `std` feature: enables `std` support in [`sha2`] for host builds

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod apply;
pub mod apt;
pub mod boot;
pub mod crc32;
pub mod data;
pub mod error;
pub mod layout;
pub mod lz4;
pub mod sha256;
pub mod sink;

pub use apt::{Apt, APT_VERSION};
pub use data::{Config, DeltaBlockHeader, DeltaSubHeader, Eui48, FirmwareHeader, Hash32, UpdateHeader, UpdateKind};
pub use error::{BootError, BootResult, PanicReason, PanicType};
pub use layout::{AcceptAll, BootLayout, HwIdPolicy};
pub use sink::{FlashGuard, HostFlash, PageSink};
