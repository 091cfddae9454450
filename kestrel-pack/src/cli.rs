// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use kestrel_core::data::Eui48;

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "kestrel-pack")]
#[command(about = "Packs firmware images for the Kestrel bootloader")]
pub struct Cli {
    /// Target hardware identifier as six colon-separated hex bytes
    /// (e.g. 00:11:22:33:44:55). Defaults to the all-zero wildcard, which
    /// the bootloader's default policy accepts unconditionally.
    #[arg(long, value_parser = parse_hwid, default_value = "00:00:00:00:00:00")]
    pub hwid: Eui48,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_hwid(s: &str) -> Result<Eui48, String> {
    let mut bytes = [0u8; 6];
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return Err("hwid must be six colon-separated hex bytes".into());
    }
    for (b, part) in bytes.iter_mut().zip(parts) {
        *b = u8::from_str_radix(part, 16).map_err(|e| e.to_string())?;
    }
    Ok(Eui48(bytes))
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pack an uncompressed firmware image.
    Plain {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        firmware: PathBuf,

        /// Output update image
        #[arg(short, long)]
        out: PathBuf,

        /// Flash page size, in bytes
        #[arg(long, default_value = "128")]
        page_size: usize,
    },

    /// Pack a self-contained LZ4-compressed firmware image.
    Lz4 {
        #[arg(value_name = "FILE")]
        firmware: PathBuf,

        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value = "128")]
        page_size: usize,
    },

    /// Pack an LZ4 block-delta update against a reference firmware image.
    Delta {
        /// New firmware binary file
        #[arg(value_name = "FILE")]
        firmware: PathBuf,

        /// Firmware image currently expected to be resident on the device
        #[arg(short, long)]
        reference: PathBuf,

        #[arg(short, long)]
        out: PathBuf,

        /// Delta block size, in bytes -- must match the bootloader's
        /// configured block size
        #[arg(short, long, default_value = "128")]
        blksize: usize,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Plain {
            firmware,
            out,
            page_size,
        } => commands::pack_plain(&firmware, page_size, cli.hwid, &out),
        Commands::Lz4 {
            firmware,
            out,
            page_size,
        } => commands::pack_lz4(&firmware, page_size, cli.hwid, &out),
        Commands::Delta {
            firmware,
            reference,
            out,
            blksize,
        } => commands::pack_delta(&firmware, &reference, blksize, cli.hwid, &out),
    }
}
