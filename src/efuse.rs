// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::fs::OpenOptions;
use std::io::Error;
use std::os::unix::prelude::*;
use std::path::PathBuf;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Length of the UUID string held in the identity slot.
pub const UUID_SIZE: usize = 36;

/// Payload capacity of a vendor storage request.
const VENDOR_DATA: usize = 1024;

/// Canonical UUID whose node starts with Hardkernel's OUI (001E06).
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new("(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-001e06[0-9a-f]{6}$")
        .expect("uuid pattern")
});

/// Storage for the board identity.
pub trait Efuse {
    /// Returns the stored UUID; an erased slot yields an empty string.
    fn read(&mut self) -> Result<String>;
    fn erase(&mut self) -> Result<()>;
    fn write(&mut self, uuid: &str) -> Result<()>;
}

/// Whether `uuid` is a well formed identity carrying the Hardkernel OUI.
pub fn valid_check(uuid: &str) -> bool {
    UUID.is_match(uuid)
}

/// Derives the MAC address (12 upper case hex digits) from a UUID.
pub fn get_mac(uuid: &str) -> Option<String> {
    if !valid_check(uuid) {
        return None;
    }

    uuid.rsplit('-').next().map(|node| node.to_ascii_uppercase())
}

#[repr(C)]
struct VendorReq {
    tag: u32,
    id: u16,
    len: u16,
    data: [u8; VENDOR_DATA],
}

impl VendorReq {
    const TAG: u32 = 0x5652_4551; // "VREQ"

    fn new(id: u16, payload: &[u8]) -> Self {
        let mut data = [0u8; VENDOR_DATA];
        data[..payload.len()].copy_from_slice(payload);

        Self {
            tag: Self::TAG,
            id,
            len: UUID_SIZE as u16,
            data,
        }
    }

    /// Decodes the outcome of a read request.
    ///
    /// The driver fails reads of an id that was never stored, which is how a
    /// virgin board looks; that is reported as an empty slot.
    fn decode(&self, result: std::io::Result<()>) -> Result<String> {
        match result {
            Ok(()) => (),
            Err(e) if matches!(e.raw_os_error(), Some(libc::EFAULT) | Some(libc::EINVAL)) => {
                log::debug!("vendor id {} not present: {}", self.id, e);
                return Ok(String::new());
            }
            Err(e) => return Err(e.into()),
        }

        let len = usize::from(self.len).min(VENDOR_DATA);
        let data = &self.data[..len];
        let end = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);

        Ok(std::str::from_utf8(&data[..end])?.trim().to_string())
    }
}

/// The Rockchip vendor storage partition, exposed as a character device.
pub struct VendorStorage {
    path: PathBuf,
    slot: u16,
}

impl VendorStorage {
    // _IOW('v', 0x01, unsigned int) and _IOW('v', 0x02, unsigned int)
    const READ_IO: u32 = 0x4004_7601;
    const WRITE_IO: u32 = 0x4004_7602;

    pub fn new(path: impl Into<PathBuf>, slot: u16) -> Self {
        Self {
            path: path.into(),
            slot,
        }
    }

    fn ioctl(&self, request: u32, req: &mut VendorReq) -> std::io::Result<()> {
        let device = OpenOptions::new().read(true).write(true).open(&self.path)?;

        let ret = unsafe { libc::ioctl(device.as_raw_fd(), request as _, req as *mut VendorReq) };
        if ret < 0 {
            return Err(Error::last_os_error());
        }

        Ok(())
    }

    fn store(&mut self, payload: &[u8]) -> Result<()> {
        let mut req = VendorReq::new(self.slot, payload);
        Ok(self.ioctl(Self::WRITE_IO, &mut req)?)
    }
}

impl Efuse for VendorStorage {
    fn read(&mut self) -> Result<String> {
        let mut req = VendorReq::new(self.slot, &[]);
        let result = self.ioctl(Self::READ_IO, &mut req);
        req.decode(result)
    }

    fn erase(&mut self) -> Result<()> {
        self.store(&[0u8; UUID_SIZE])
    }

    fn write(&mut self, uuid: &str) -> Result<()> {
        if uuid.len() > UUID_SIZE {
            bail!("uuid must be at most {} bytes, got {}", UUID_SIZE, uuid.len());
        }

        self.store(uuid.as_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const UUID: &str = "3AAEF75C-A164-433B-8D34-001E06530012";

    #[test]
    fn valid() {
        assert!(valid_check(UUID));
        assert!(valid_check(&UUID.to_lowercase()));
    }

    #[test]
    fn invalid() {
        assert!(!valid_check(""));
        assert!(!valid_check("3AAEF75CA164433B8D34001E06530012"));
        assert!(!valid_check("3AAEF75C-A164-433B-8D34-001E0653001"));
        assert!(!valid_check("3AAEF75C-A164-433B-8D34-001E065300123"));
        assert!(!valid_check("3AAEF75C-A164-433B-8D34-00AABB530012"));
        assert!(!valid_check("3AAEF75G-A164-433B-8D34-001E06530012"));
    }

    #[test]
    fn mac() {
        assert_eq!(get_mac(UUID).as_deref(), Some("001E06530012"));
        assert_eq!(
            get_mac("3aaef75c-a164-433b-8d34-001e0653abcd").as_deref(),
            Some("001E0653ABCD")
        );
        assert_eq!(get_mac(""), None);
    }

    #[test]
    fn request() {
        let req = VendorReq::new(7, UUID.as_bytes());
        assert_eq!(req.tag.to_le_bytes(), *b"QERV");
        assert_eq!(req.id, 7);
        assert_eq!(usize::from(req.len), UUID_SIZE);
        assert_eq!(&req.data[..UUID_SIZE], UUID.as_bytes());
        assert!(req.data[UUID_SIZE..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decode_stored() {
        let req = VendorReq::new(1, UUID.as_bytes());
        assert_eq!(req.decode(Ok(())).unwrap(), UUID);

        let req = VendorReq::new(1, &[0u8; UUID_SIZE]);
        assert_eq!(req.decode(Ok(())).unwrap(), "");
    }

    #[test]
    fn decode_unset_id() {
        let req = VendorReq::new(1, &[]);
        let unset = Error::from_raw_os_error(libc::EFAULT);
        assert_eq!(req.decode(Err(unset)).unwrap(), "");

        let denied = Error::from_raw_os_error(libc::EACCES);
        assert!(req.decode(Err(denied)).is_err());
    }

    #[test]
    fn missing_device() {
        let mut storage = VendorStorage::new("/nonexistent/vendor_storage", 1);
        assert!(storage.read().is_err());
        assert!(storage.erase().is_err());
        assert!(storage.write(UUID).is_err());
        assert!(storage.write(&format!("{}0", UUID)).is_err());
    }
}
