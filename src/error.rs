//! # Error Types
//!
//! This module defines error types used throughout the buzon crate.
//!
//! Expected control-flow outcomes (denied sender, already-seen id, absent
//! printer) are *not* errors — the intake loop represents those as explicit
//! outcome values. These variants cover genuine faults only.

use thiserror::Error;

/// Main error type for buzon operations
#[derive(Debug, Error)]
pub enum BuzonError {
    /// Transport-level errors (device open, write, disconnect)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Gateway errors (network failure, API error response)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Image decode/processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
