//! # Configuration
//!
//! All runtime knobs in one immutable struct, read once from the
//! environment at startup. Nothing else in the crate touches process
//! state: every component receives the values it needs through its
//! constructor, so tests can build a [`Config`] by hand.
//!
//! ## Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `BUZON_GATEWAY_TOKEN` | (required) | Bot API token |
//! | `BUZON_POLL_TIMEOUT` | `30` | Long-poll hold time, seconds |
//! | `BUZON_ALLOWLIST` | (empty) | Comma-separated permitted sender ids |
//! | `BUZON_CONTACTS` | (empty) | `name:id,name:id` display-name map |
//! | `BUZON_HEADER` | `BUZON` | Banner text on every printout |
//! | `BUZON_STATE_FILE` | `buzon_state.json` | Seen-id store path |
//! | `BUZON_STATE_LIMIT` | `5000` | Retained seen ids |
//! | `BUZON_MAX_PHOTO_MB` | `5` | Per-photo download cap |
//! | `BUZON_MAX_ATTACHMENTS` | `3` | Photos printed per message |
//! | `PRINTER_DRIVER` | `usb` | `usb`/`serial`/`network`/`bluetooth`/`dummy` |
//! | `PRINTER_USB_VENDOR` | `0x0416` | USB vendor id (hex or decimal) |
//! | `PRINTER_USB_PRODUCT` | `0x5011` | USB product id (hex or decimal) |
//! | `PRINTER_SERIAL_PORT` | `/dev/ttyUSB0` | Serial device path |
//! | `PRINTER_SERIAL_BAUD` | `9600` | Serial baud rate |
//! | `PRINTER_NETWORK_HOST` | (required for network) | Printer hostname |
//! | `PRINTER_NETWORK_PORT` | `9100` | Raw JetDirect port |
//! | `PRINTER_BLUETOOTH_MAC` | (required for bluetooth) | Bonded MAC |
//! | `PRINTER_LINE_WIDTH` | `32` | Text columns |
//! | `PRINTER_RASTER_WIDTH` | `384` | Image width in dots |

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::allowlist::{Allowlist, ContactBook};
use crate::error::BuzonError;
use crate::transport::TransportConfig;

/// Immutable runtime configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway bot token.
    pub gateway_token: String,
    /// Long-poll hold time.
    pub poll_timeout: Duration,
    /// Permitted sender ids (empty permits everyone).
    pub allowlist: Allowlist,
    /// Sender id to display name mapping.
    pub contacts: ContactBook,
    /// Banner printed at the top of every message.
    pub header_text: String,
    /// Where the seen-id store lives.
    pub state_file: PathBuf,
    /// How many seen ids to retain.
    pub state_limit: usize,
    /// Largest photo the gateway will download, in bytes.
    pub max_photo_bytes: u64,
    /// Photos printed per message.
    pub max_attachments: usize,
    /// Which printer to drive.
    pub transport: TransportConfig,
    /// Printer text width in characters.
    pub line_width: usize,
    /// Printer raster width in dots.
    pub raster_width: u16,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, BuzonError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    /// Build from an explicit variable map. This is the real constructor;
    /// [`from_env`](Self::from_env) is a thin wrapper over it.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, BuzonError> {
        let gateway_token = match vars.get("BUZON_GATEWAY_TOKEN") {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => {
                return Err(BuzonError::Config(
                    "BUZON_GATEWAY_TOKEN is not set".to_string(),
                ))
            }
        };

        let poll_timeout = Duration::from_secs(parse_u64(vars, "BUZON_POLL_TIMEOUT", 30)?);
        let allowlist = Allowlist::parse(vars.get("BUZON_ALLOWLIST").map_or("", |v| v));
        let contacts = ContactBook::parse(vars.get("BUZON_CONTACTS").map_or("", |v| v));
        let header_text = vars
            .get("BUZON_HEADER")
            .map_or_else(|| "BUZON".to_string(), |v| v.trim().to_string());
        let state_file = PathBuf::from(
            vars.get("BUZON_STATE_FILE")
                .map_or("buzon_state.json", |v| v.as_str()),
        );
        let state_limit = parse_u64(vars, "BUZON_STATE_LIMIT", 5000)? as usize;
        let max_photo_bytes = parse_u64(vars, "BUZON_MAX_PHOTO_MB", 5)? * 1024 * 1024;
        let max_attachments = parse_u64(vars, "BUZON_MAX_ATTACHMENTS", 3)? as usize;

        let transport = parse_transport(vars)?;
        let line_width = parse_u64(vars, "PRINTER_LINE_WIDTH", 32)? as usize;
        let raster_width = parse_u64(vars, "PRINTER_RASTER_WIDTH", 384)? as u16;

        Ok(Config {
            gateway_token,
            poll_timeout,
            allowlist,
            contacts,
            header_text,
            state_file,
            state_limit,
            max_photo_bytes,
            max_attachments,
            transport,
            line_width,
            raster_width,
        })
    }
}

fn parse_transport(vars: &HashMap<String, String>) -> Result<TransportConfig, BuzonError> {
    let driver = vars
        .get("PRINTER_DRIVER")
        .map_or("usb", |v| v.as_str())
        .trim()
        .to_lowercase();
    match driver.as_str() {
        "usb" => Ok(TransportConfig::Usb {
            vendor: parse_id(vars, "PRINTER_USB_VENDOR", 0x0416)?,
            product: parse_id(vars, "PRINTER_USB_PRODUCT", 0x5011)?,
        }),
        "serial" => Ok(TransportConfig::Serial {
            device: PathBuf::from(
                vars.get("PRINTER_SERIAL_PORT")
                    .map_or("/dev/ttyUSB0", |v| v.as_str()),
            ),
            baud: parse_u64(vars, "PRINTER_SERIAL_BAUD", 9600)? as u32,
        }),
        "network" => {
            let host = vars
                .get("PRINTER_NETWORK_HOST")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    BuzonError::Config(
                        "PRINTER_NETWORK_HOST is required for the network driver".to_string(),
                    )
                })?;
            Ok(TransportConfig::Network {
                host,
                port: parse_u64(vars, "PRINTER_NETWORK_PORT", 9100)? as u16,
            })
        }
        "bluetooth" => {
            let mac = vars
                .get("PRINTER_BLUETOOTH_MAC")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    BuzonError::Config(
                        "PRINTER_BLUETOOTH_MAC is required for the bluetooth driver".to_string(),
                    )
                })?;
            Ok(TransportConfig::Bluetooth { mac })
        }
        "dummy" => Ok(TransportConfig::Dummy),
        other => Err(BuzonError::Config(format!(
            "Unknown PRINTER_DRIVER '{other}'. Use usb, serial, network, bluetooth or dummy"
        ))),
    }
}

/// Parse a decimal integer variable, falling back to `default` when unset.
fn parse_u64(vars: &HashMap<String, String>, key: &str, default: u64) -> Result<u64, BuzonError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BuzonError::Config(format!("{key} is not a number: '{raw}'"))),
    }
}

/// Parse a USB id, accepting both `0x0416` and plain decimal.
fn parse_id(vars: &HashMap<String, String>, key: &str, default: u16) -> Result<u16, BuzonError> {
    let raw = match vars.get(key) {
        None => return Ok(default),
        Some(raw) if raw.trim().is_empty() => return Ok(default),
        Some(raw) => raw.trim(),
    };
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| BuzonError::Config(format!("{key} is not a USB id: '{raw}'")))
}

// ============================================================================
// TESTS
// ============================================================================
