// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The five-step boot sequence (C6): install a committed staged update,
//! verify the resident firmware's integrity, clear the commit pointers,
//! and hand control to firmware -- panicking through [`BootHost::panic`]
//! instead of ever returning on a failure path.
//!
//! Flash is execute-in-place on the real target, so the resident firmware
//! and any staged update are read as `'static` byte slices rather than
//! copied through [`crate::sink::HostFlash::read`]; [`BootHost`]
//! implementations are responsible for ensuring those slices never alias
//! the region [`crate::apply::apply`] writes to, which holds as long as
//! [`crate::layout::BootLayout::room_before`] is respected.

use crate::apply;
use crate::crc32;
use crate::data::{Config, Eui48, FirmwareHeader, Hash32, UpdateHeader};
use crate::error::{BootError, BootResult, PanicReason, PanicType};
use crate::layout::BootLayout;
use crate::sink::HostFlash;

/// Everything the boot sequence needs from the target beyond raw flash
/// writes: EEPROM access, hardware-id policy, and the panic channel.
pub trait BootHost: HostFlash {
    fn config(&self) -> Config;
    fn eeprom_unlock(&mut self);
    fn eeprom_lock(&mut self);
    fn eeprom_write_hash(&mut self, hash: Hash32);
    fn eeprom_write_fwupdate1(&mut self, ptr: u32);
    fn eeprom_write_fwupdate2(&mut self, ptr: u32);

    fn hwid_accepted(&self, hwid: &Eui48) -> bool;

    /// The resident firmware region, from `layout.fw_base` to the end of
    /// flash. Bounds beyond the actual firmware image are never read by
    /// this module once `FirmwareHeader::size` is known.
    fn current_fw(&self) -> &'static [u8];

    /// Flash from byte offset `ptr_off` (relative to `layout.flash_base`)
    /// to the end of flash, used to read a staged update whose exact size
    /// isn't known until its header is parsed.
    fn staged_update(&self, ptr_off: u32) -> &'static [u8];

    fn panic(&mut self, kind: PanicType, reason: PanicReason, addr: u32) -> !;
}

fn validate_update<H: BootHost>(
    host: &H,
    ptr_off: u32,
    bytes: &'static [u8],
) -> Option<(UpdateHeader, &'static [u8])> {
    if ptr_off & 3 != 0 || bytes.len() < UpdateHeader::SIZE {
        return None;
    }
    let hdr = UpdateHeader::from_bytes(bytes);
    if hdr.size < UpdateHeader::SIZE as u32 || hdr.size & 3 != 0 || hdr.size as usize > bytes.len() {
        return None;
    }
    let body = &bytes[..hdr.size as usize];
    if crc32::checksum(&body[8..]) != hdr.crc {
        return None;
    }
    if !host.hwid_accepted(&hdr.hwid) {
        return None;
    }
    Some((hdr, body))
}

/// Stage, validate, or clear an update commit pointer (the two-write
/// EEPROM commit, invariant I1). `ptr` is an absolute flash address, or 0
/// to clear. When `ptr` is nonzero, the update is validated and dry-run
/// applied (`install = false`) before anything is written to EEPROM --
/// writing the hash first, then both copies of the pointer.
pub fn set_update<H: BootHost, const PAGE: usize, const BLK: usize>(
    host: &mut H,
    layout: &BootLayout,
    ptr: u32,
    hash: Option<&Hash32>,
) -> BootResult<()> {
    if ptr != 0 {
        let ptr_off = ptr - layout.flash_base;
        let bytes = host.staged_update(ptr_off);
        let (_, body) = validate_update(host, ptr_off, bytes).ok_or(BootError::Size)?;
        apply::apply::<H, PAGE, BLK>(host, layout, ptr_off, body, false)?;
    }

    host.eeprom_unlock();
    if let Some(h) = hash {
        host.eeprom_write_hash(*h);
    }
    host.eeprom_write_fwupdate1(ptr);
    host.eeprom_write_fwupdate2(ptr);
    host.eeprom_lock();
    Ok(())
}

fn do_install<H: BootHost, const PAGE: usize, const BLK: usize>(
    host: &mut H,
    layout: &BootLayout,
    ptr_off: u32,
    body: &'static [u8],
) {
    if apply::apply::<H, PAGE, BLK>(host, layout, ptr_off, body, true).is_err() {
        host.panic(PanicType::Bootloader, PanicReason::Update, 0);
    }
}

/// Run the boot sequence and return the verified firmware's entry point.
/// Never returns on a failure path: every failure that the original
/// bootloader resets over goes through [`BootHost::panic`] instead.
pub fn run<H: BootHost, const PAGE: usize, const BLK: usize>(host: &mut H, layout: &BootLayout) -> u32 {
    let cfg = host.config();

    if cfg.is_committed() && cfg.fwupdate1 != 0 {
        let ptr_off = cfg.fwupdate1 - layout.flash_base;
        let bytes = host.staged_update(ptr_off);
        if let Some((_, body)) = validate_update(host, ptr_off, bytes) {
            do_install::<H, PAGE, BLK>(host, layout, ptr_off, body);
        }
    }

    let fw_all = host.current_fw();
    let fwh = verify_resident_firmware(fw_all)
        .unwrap_or_else(|| host.panic(PanicType::Bootloader, PanicReason::Crc, 0));

    if cfg.fwupdate1 != 0 || cfg.fwupdate2 != 0 {
        host.eeprom_unlock();
        host.eeprom_write_fwupdate1(0);
        host.eeprom_write_fwupdate2(0);
        host.eeprom_lock();
    }

    fwh.entrypoint
}

fn verify_resident_firmware(fw: &[u8]) -> Option<FirmwareHeader> {
    if fw.len() < FirmwareHeader::SIZE {
        return None;
    }
    let hdr = FirmwareHeader::from_bytes(fw);
    if (hdr.size as usize) < FirmwareHeader::SIZE || hdr.size as usize > fw.len() {
        return None;
    }
    if crc32::checksum(&fw[8..hdr.size as usize]) != hdr.crc {
        return None;
    }
    Some(hdr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sha256;
    use std::cell::RefCell;
    use std::vec::Vec;

    const PAGE: usize = 8;
    const BLK: usize = 8;

    struct TestHost {
        flash_locked: bool,
        eeprom_locked: bool,
        image: RefCell<Vec<u8>>,
        cfg: Config,
        panicked: RefCell<Option<(PanicType, PanicReason, u32)>>,
        fw_base: u32,
    }

    impl TestHost {
        fn new(image: Vec<u8>, fw_base: u32, cfg: Config) -> Self {
            TestHost {
                flash_locked: true,
                eeprom_locked: true,
                image: RefCell::new(image),
                cfg,
                panicked: RefCell::new(None),
                fw_base,
            }
        }

        fn leaked_slice(&self, off: u32) -> &'static [u8] {
            let bytes = self.image.borrow()[off as usize..].to_vec();
            Box::leak(bytes.into_boxed_slice())
        }
    }

    impl HostFlash for TestHost {
        fn unlock(&mut self) {
            self.flash_locked = false;
        }
        fn lock(&mut self) {
            self.flash_locked = true;
        }
        fn write_page(&mut self, dst_offset: u32, page: &[u8]) -> BootResult<()> {
            assert!(!self.flash_locked);
            let off = dst_offset as usize;
            self.image.borrow_mut()[off..off + page.len()].copy_from_slice(page);
            Ok(())
        }
        fn read(&self, offset: u32, buf: &mut [u8]) {
            let off = offset as usize;
            buf.copy_from_slice(&self.image.borrow()[off..off + buf.len()]);
        }
    }

    impl BootHost for TestHost {
        fn config(&self) -> Config {
            self.cfg
        }
        fn eeprom_unlock(&mut self) {
            self.eeprom_locked = false;
        }
        fn eeprom_lock(&mut self) {
            self.eeprom_locked = true;
        }
        fn eeprom_write_hash(&mut self, hash: Hash32) {
            assert!(!self.eeprom_locked);
            self.cfg.hash = hash;
        }
        fn eeprom_write_fwupdate1(&mut self, ptr: u32) {
            assert!(!self.eeprom_locked);
            self.cfg.fwupdate1 = ptr;
        }
        fn eeprom_write_fwupdate2(&mut self, ptr: u32) {
            assert!(!self.eeprom_locked);
            self.cfg.fwupdate2 = ptr;
        }
        fn hwid_accepted(&self, _hwid: &Eui48) -> bool {
            true
        }
        fn current_fw(&self) -> &'static [u8] {
            self.leaked_slice(self.fw_base)
        }
        fn staged_update(&self, ptr_off: u32) -> &'static [u8] {
            self.leaked_slice(ptr_off)
        }
        fn panic(&mut self, kind: PanicType, reason: PanicReason, addr: u32) -> ! {
            *self.panicked.borrow_mut() = Some((kind, reason, addr));
            panic!("boot panic: {:?} {:?} @ {:#x}", kind, reason, addr);
        }
    }

    fn layout() -> BootLayout {
        BootLayout {
            flash_base: 0,
            flash_size: 4096,
            fw_base: 0x100,
            eeprom_base: 0xF00,
            eeprom_size: 0x40,
            flash_page_size: PAGE as u32,
        }
    }

    fn firmware_image(entrypoint: u32, body: &[u8]) -> Vec<u8> {
        let size = (FirmwareHeader::SIZE + body.len()) as u32;
        let mut buf = vec![0u8; FirmwareHeader::SIZE];
        buf[4..8].copy_from_slice(&size.to_le_bytes());
        buf[8..12].copy_from_slice(&entrypoint.to_le_bytes());
        buf.extend_from_slice(body);
        let crc = crc32::checksum(&buf[8..]);
        buf[0..4].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    #[test]
    fn boots_with_no_staged_update() {
        let mut image = vec![0u8; 4096];
        let fw = firmware_image(0x2000, &[0xAA; 16]);
        image[0x100..0x100 + fw.len()].copy_from_slice(&fw);

        let l = layout();
        let mut host = TestHost::new(image, l.fw_base, Config::empty());
        let entry = run::<_, PAGE, BLK>(&mut host, &l);
        assert_eq!(entry, 0x2000);
    }

    #[test]
    fn clears_commit_pointers_after_boot() {
        let mut image = vec![0u8; 4096];
        let fw = firmware_image(0x2000, &[0xAA; 16]);
        image[0x100..0x100 + fw.len()].copy_from_slice(&fw);

        let l = layout();
        let mut cfg = Config::empty();
        cfg.fwupdate1 = 0x800;
        cfg.fwupdate2 = 0x900; // uncommitted: pointers disagree, no install attempted
        let mut host = TestHost::new(image, l.fw_base, cfg);
        run::<_, PAGE, BLK>(&mut host, &l);
        assert_eq!(host.cfg.fwupdate1, 0);
        assert_eq!(host.cfg.fwupdate2, 0);
    }

    #[test]
    fn installs_committed_update_then_clears_pointer() {
        let mut image = vec![0u8; 4096];
        let old_fw = firmware_image(0x2000, &[0x00; 16]);
        image[0x100..0x100 + old_fw.len()].copy_from_slice(&old_fw);

        // plain update image staged at 0x800, itself a full replacement
        // firmware image with its own header and a new entry point.
        let new_fw = firmware_image(0x3000, &[0xBB; 4]);
        let mut uphdr = vec![0u8; UpdateHeader::SIZE];
        let total = (UpdateHeader::SIZE + new_fw.len()) as u32;
        uphdr[4..8].copy_from_slice(&total.to_le_bytes());
        uphdr[12..16].copy_from_slice(&(new_fw.len() as u32).to_le_bytes());
        uphdr[22] = 0; // plain
        let crc = crc32::checksum(&{
            let mut tail = uphdr[8..].to_vec();
            tail.extend_from_slice(&new_fw);
            tail
        });
        uphdr[0..4].copy_from_slice(&crc.to_le_bytes());
        image[0x800..0x800 + uphdr.len()].copy_from_slice(&uphdr);
        image[0x800 + uphdr.len()..0x800 + uphdr.len() + new_fw.len()].copy_from_slice(&new_fw);

        let l = layout();
        let mut cfg = Config::empty();
        cfg.fwupdate1 = 0x800;
        cfg.fwupdate2 = 0x800; // committed
        let mut host = TestHost::new(image, l.fw_base, cfg);

        let entry = run::<_, PAGE, BLK>(&mut host, &l);
        assert_eq!(entry, 0x3000);
        assert_eq!(host.cfg.fwupdate1, 0);
        assert_eq!(host.cfg.fwupdate2, 0);
        assert_eq!(&host.image.borrow()[0x100..0x100 + new_fw.len()], &new_fw[..]);
    }

    #[test]
    fn set_update_writes_hash_before_either_pointer() {
        let image = vec![0u8; 4096];
        let l = layout();
        let mut host = TestHost::new(image, l.fw_base, Config::empty());
        let hash = sha256::hash(b"whatever");
        set_update::<_, PAGE, BLK>(&mut host, &l, 0, Some(&hash)).unwrap();
        assert_eq!(host.cfg.hash, hash);
        assert_eq!(host.cfg.fwupdate1, 0);
        assert_eq!(host.cfg.fwupdate2, 0);
    }
}
