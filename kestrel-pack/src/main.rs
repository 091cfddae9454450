// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Packs firmware images into plain, LZ4, or LZ4 block-delta update files
//! for the Kestrel bootloader.
//!
//! Usage:
//!   kestrel-pack plain firmware.bin --out update.img
//!   kestrel-pack lz4 firmware.bin --out update.img
//!   kestrel-pack delta firmware.bin --reference old_firmware.bin --out update.img

mod cli;
mod commands;
mod lz4_hc;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
