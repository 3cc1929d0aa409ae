//! # Status Display Hook
//!
//! A side channel for ambient "new mail" indicators (the reference
//! deployment drives a small e-ink panel). The intake loop notifies the
//! sink after each batch that produced output; the call is fire-and-forget
//! and a sink must never let a failure escape back into the loop.

use log::info;

/// Receives best-effort notifications about printed batches.
pub trait StatusSink: Send {
    /// Called after a batch in which `new_count > 0` messages printed.
    /// `last_sender` is the label of the most recent one.
    fn batch_printed(&self, new_count: usize, last_sender: Option<&str>);
}

/// The built-in sink: writes the update to the log.
#[derive(Debug, Default)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn batch_printed(&self, new_count: usize, last_sender: Option<&str>) {
        match last_sender {
            Some(sender) => info!("Printed {} new message(s), last from {}", new_count, sender),
            None => info!("Printed {} new message(s)", new_count),
        }
    }
}
