//! RFCOMM device resolution for Bluetooth SPP printers.
//!
//! Pairing and binding are one-time admin steps done outside this process:
//!
//! ```bash
//! $ bluetoothctl pair 00:11:62:XX:XX:XX
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # creates /dev/rfcomm0
//! ```
//!
//! At runtime we only need to map the configured MAC back to its bound
//! `/dev/rfcommN` node, which the kernel lists in `/proc/net/rfcomm`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuzonError;

/// Kernel's RFCOMM binding table. Lines look like:
/// `rfcomm0: 00:11:62:AA:BB:CC channel 1 clean`
const RFCOMM_TABLE: &str = "/proc/net/rfcomm";

/// Validate a Bluetooth MAC address (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Resolve a paired MAC to its bound RFCOMM device path.
pub fn resolve(mac: &str) -> Result<PathBuf, BuzonError> {
    if !is_valid_mac(mac) {
        return Err(BuzonError::Transport(format!(
            "Invalid Bluetooth address '{}'",
            mac
        )));
    }
    let table = fs::read_to_string(RFCOMM_TABLE)
        .map_err(|e| BuzonError::Transport(format!("No RFCOMM support ({}): {}", RFCOMM_TABLE, e)))?;

    match find_in_table(&table, mac) {
        Some(device) if Path::new(&device).exists() => Ok(device),
        Some(device) => Err(BuzonError::Transport(format!(
            "RFCOMM binding for {} exists but {} is missing",
            mac,
            device.display()
        ))),
        None => Err(BuzonError::Transport(format!(
            "No RFCOMM device bound to {} (run 'rfcomm bind')",
            mac
        ))),
    }
}

/// Scan the binding table text for a MAC and return its device path.
fn find_in_table(table: &str, mac: &str) -> Option<PathBuf> {
    let mac_upper = mac.to_uppercase();
    for line in table.lines() {
        if line.to_uppercase().contains(&mac_upper) {
            let dev_name = line.split(':').next()?.trim();
            return Some(PathBuf::from(format!("/dev/{}", dev_name)));
        }
    }
    None
}
