//! USB printer discovery.
//!
//! USB ESC/POS printers expose the USB printer class, which the Linux
//! `usblp` driver surfaces as `/dev/usb/lpN`. To address a printer by
//! vendor/product id we walk `/sys/class/usbmisc/lp*`, follow each node to
//! its USB device directory, and compare `idVendor`/`idProduct`.
//!
//! No direct libusb access: writing the character device keeps the kernel
//! driver attached and needs no special privileges beyond the `lp` group.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::BuzonError;

/// Sysfs directory listing usblp class devices.
const USBMISC_DIR: &str = "/sys/class/usbmisc";

/// Find the `/dev/usb/lpN` node for a printer with the given descriptor ids.
pub fn find_lp_device(vendor: u16, product: u16) -> Result<PathBuf, BuzonError> {
    let entries = fs::read_dir(USBMISC_DIR).map_err(|e| {
        BuzonError::Transport(format!("No USB printer support ({}: {})", USBMISC_DIR, e))
    })?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("lp") {
            continue;
        }
        // lpN sysfs node -> usblp interface dir -> parent USB device dir
        let device_dir = entry.path().join("device").join("..");
        match read_ids(&device_dir) {
            Some((v, p)) if v == vendor && p == product => {
                let dev = PathBuf::from(format!("/dev/usb/{}", name));
                debug!(
                    "USB printer {:04x}:{:04x} resolved to {}",
                    vendor,
                    product,
                    dev.display()
                );
                return Ok(dev);
            }
            Some((v, p)) => {
                debug!("Skipping {} ({:04x}:{:04x})", name, v, p);
            }
            None => {}
        }
    }

    Err(BuzonError::Transport(format!(
        "No USB printer with id {:04x}:{:04x} found",
        vendor, product
    )))
}

/// Read idVendor/idProduct from a sysfs USB device directory.
fn read_ids(device_dir: &Path) -> Option<(u16, u16)> {
    let vendor = read_hex(&device_dir.join("idVendor"))?;
    let product = read_hex(&device_dir.join("idProduct"))?;
    Some((vendor, product))
}

fn read_hex(path: &Path) -> Option<u16> {
    let raw = fs::read_to_string(path).ok()?;
    u16::from_str_radix(raw.trim(), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_hex_parses_sysfs_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idVendor");
        // Sysfs id files are lowercase hex with a trailing newline
        writeln!(fs::File::create(&path).unwrap(), "0416").unwrap();
        assert_eq!(read_hex(&path), Some(0x0416));
    }

    #[test]
    fn read_hex_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idVendor");
        writeln!(fs::File::create(&path).unwrap(), "not-hex").unwrap();
        assert_eq!(read_hex(&path), None);
        assert_eq!(read_hex(&dir.path().join("missing")), None);
    }

    #[test]
    fn read_ids_needs_both_files() {
        let dir = tempfile::tempdir().unwrap();
        writeln!(fs::File::create(dir.path().join("idVendor")).unwrap(), "0416").unwrap();
        assert_eq!(read_ids(dir.path()), None);
        writeln!(fs::File::create(dir.path().join("idProduct")).unwrap(), "5011").unwrap();
        assert_eq!(read_ids(dir.path()), Some((0x0416, 0x5011)));
    }
}
