//! # Printer Transports
//!
//! One closed set of output channels behind a single submission contract.
//! Exactly one variant is selected at startup from configuration; the intake
//! loop holds the chosen [`PrinterTransport`] and nothing else.
//!
//! Selection failures (device missing, wrong permissions, connection
//! refused) are not faults: [`PrinterTransport::open`] logs them and returns
//! `None`, and callers treat an absent printer as "skip physical output and
//! keep going".
//!
//! ## Chunked Writes
//!
//! Device-file transports write large jobs in chunks with a small delay so a
//! slow printer's buffer is never overrun (raster jobs routinely run tens of
//! kilobytes).

mod dummy;
mod network;
mod rfcomm;
mod tty;
mod usb;

pub use dummy::DummyTransport;

use std::fs::File;
use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{error, info};

use crate::error::BuzonError;

/// Default chunk size for device-file writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// Which physical channel to use and how to address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// USB printer class device, matched by descriptor ids.
    Usb { vendor: u16, product: u16 },
    /// Serial/TTL adapter at a device path.
    Serial { device: PathBuf, baud: u32 },
    /// Network printer speaking raw ESC/POS on a TCP port (usually 9100).
    Network { host: String, port: u16 },
    /// Bluetooth SPP printer, addressed by its paired MAC. The device must
    /// already be bound to an RFCOMM node (`rfcomm bind`).
    Bluetooth { mac: String },
    /// No hardware: jobs go to the log (and a capture buffer in tests).
    Dummy,
}

/// An open printer connection.
pub enum PrinterTransport {
    Usb { file: File, path: PathBuf },
    Serial { file: File, path: PathBuf },
    Network { stream: TcpStream },
    Bluetooth { file: File, path: PathBuf },
    Dummy(DummyTransport),
}

impl PrinterTransport {
    /// Open the transport named by `config`.
    ///
    /// Never panics and never propagates an error: any failure is logged
    /// and collapses to `None`, which callers must treat as "no printer
    /// right now". A later call may succeed (device replugged, printer
    /// powered on), so the intake loop retries per job.
    pub fn open(config: &TransportConfig) -> Option<Self> {
        let result = match config {
            TransportConfig::Usb { vendor, product } => Self::open_usb(*vendor, *product),
            TransportConfig::Serial { device, baud } => Self::open_serial(device.clone(), *baud),
            TransportConfig::Network { host, port } => Self::open_network(host, *port),
            TransportConfig::Bluetooth { mac } => Self::open_bluetooth(mac),
            TransportConfig::Dummy => Ok(Self::Dummy(DummyTransport::new())),
        };
        match result {
            Ok(transport) => {
                info!("Printer connected: {}", transport.describe());
                Some(transport)
            }
            Err(e) => {
                error!("Failed to open printer: {}", e);
                None
            }
        }
    }

    fn open_usb(vendor: u16, product: u16) -> Result<Self, BuzonError> {
        let path = usb::find_lp_device(vendor, product)?;
        let file = File::options().write(true).open(&path).map_err(|e| {
            BuzonError::Transport(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self::Usb { file, path })
    }

    fn open_serial(device: PathBuf, baud: u32) -> Result<Self, BuzonError> {
        let file = tty::open_raw(&device, Some(baud))?;
        Ok(Self::Serial { file, path: device })
    }

    fn open_network(host: &str, port: u16) -> Result<Self, BuzonError> {
        let stream = network::connect(host, port)?;
        Ok(Self::Network { stream })
    }

    fn open_bluetooth(mac: &str) -> Result<Self, BuzonError> {
        let path = rfcomm::resolve(mac)?;
        let file = tty::open_raw(&path, None)?;
        Ok(Self::Bluetooth { file, path })
    }

    /// Human-readable description of the open channel, for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Usb { path, .. } => format!("usb ({})", path.display()),
            Self::Serial { path, .. } => format!("serial ({})", path.display()),
            Self::Network { stream } => match stream.peer_addr() {
                Ok(addr) => format!("network ({})", addr),
                Err(_) => "network".to_string(),
            },
            Self::Bluetooth { path, .. } => format!("bluetooth ({})", path.display()),
            Self::Dummy(_) => "dummy".to_string(),
        }
    }

    /// Send an encoded job to the device.
    ///
    /// Any error here means the handle can no longer be trusted (a wedged
    /// TTY, a half-closed socket); the caller drops it and reopens on the
    /// next job.
    pub fn submit(&mut self, data: &[u8]) -> Result<(), BuzonError> {
        match self {
            Self::Usb { file, .. } | Self::Serial { file, .. } | Self::Bluetooth { file, .. } => {
                write_chunked(file, data)?;
                file.flush()
                    .map_err(|e| BuzonError::Transport(format!("Flush failed: {}", e)))
            }
            Self::Network { stream } => {
                stream
                    .write_all(data)
                    .and_then(|_| stream.flush())
                    .map_err(|e| BuzonError::Transport(format!("Socket write failed: {}", e)))
            }
            Self::Dummy(dummy) => dummy.submit(data),
        }
    }
}

/// Write data in chunks with a pacing delay between them.
fn write_chunked<W: Write>(writer: &mut W, data: &[u8]) -> Result<(), BuzonError> {
    for chunk in data.chunks(CHUNK_SIZE) {
        writer
            .write_all(chunk)
            .map_err(|e| BuzonError::Transport(format!("Write failed: {}", e)))?;
        if data.len() > CHUNK_SIZE {
            thread::sleep(Duration::from_millis(CHUNK_DELAY_MS));
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
