// Copyright (c) 2026 ADNT Sarl <info@adnt.io>
// SPDX-License-Identifier: MIT

use std::env;
use std::fs;
use std::path::PathBuf;

/// Firmware lives in application flash, past the bootloader region: flash
/// starts at `0x0800_0000`, the bootloader occupies the first 8K, leaving
/// 120K for this image plus any staged update.
const MEMORY_X: &str = r#"
MEMORY
{
  FLASH : ORIGIN = 0x08002000, LENGTH = 120K
  RAM   : ORIGIN = 0x20000000, LENGTH = 20K
}
"#;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("memory.x"), MEMORY_X).expect("failed to write memory.x");

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg=-Tlink.x");
    println!("cargo:rustc-link-arg=-Tdefmt.x");
    println!("cargo:rerun-if-changed=build.rs");
}
