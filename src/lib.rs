//! # Buzon - Thermal Printer Message Mailbox
//!
//! Buzon turns a thermal receipt printer into a household fax machine:
//! a bot gateway receives short text/photo messages from family members,
//! and an always-on process polls for new messages and prints each one
//! as a receipt.
//!
//! The crate provides:
//!
//! - **Protocol implementation**: ESC/POS command builders
//! - **Raster conversion**: Floyd-Steinberg dithering for photo printing
//! - **Transports**: USB, serial, network, Bluetooth RFCOMM, and a dummy
//! - **Intake loop**: long-poll retrieval with crash-safe deduplication
//!
//! ## Quick Start
//!
//! ```no_run
//! use buzon::{
//!     job::OutputJob,
//!     transport::{PrinterTransport, TransportConfig},
//! };
//!
//! // Open whichever printer the configuration names
//! let config = TransportConfig::Network { host: "192.168.1.50".into(), port: 9100 };
//! let mut printer = PrinterTransport::open(&config).expect("printer not reachable");
//!
//! // Build and submit a job
//! let job = OutputJob::receipt("BUZON", "2026-08-30 09:15", "grandma (111)", "hi!", &[], 32);
//! printer.submit(&job.encode()).unwrap();
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command builders |
//! | [`render`] | Dithering and photo-to-raster conversion |
//! | [`transport`] | Printer communication backends |
//! | [`job`] | Print job model and encoding |
//! | [`gateway`] | Message gateway client (Telegram bot API) |
//! | [`state`] | Crash-safe seen-message store |
//! | [`allowlist`] | Sender admission and contact names |
//! | [`intake`] | The polling orchestrator |
//! | [`status`] | Best-effort status display hook |
//! | [`config`] | Runtime configuration |
//! | [`error`] | Error types |

pub mod allowlist;
pub mod config;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod job;
pub mod protocol;
pub mod render;
pub mod state;
pub mod status;
pub mod transport;

// Re-exports for convenience
pub use error::BuzonError;
pub use gateway::Message;
pub use transport::PrinterTransport;
