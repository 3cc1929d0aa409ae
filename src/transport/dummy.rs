//! The no-hardware transport.
//!
//! Renders submitted jobs to the log, optionally captures the raw bytes in
//! a shared buffer, and can be scripted to fail — the test double behind
//! most of the intake loop's test coverage, and the fallback for machines
//! with no printer attached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::info;

use crate::error::BuzonError;

/// A stand-in printer that swallows jobs.
#[derive(Default)]
pub struct DummyTransport {
    capture: Option<Arc<Mutex<Vec<Vec<u8>>>>>,
    fail_remaining: Arc<AtomicUsize>,
    on_submit: Option<Box<dyn FnMut(&[u8]) + Send>>,
}

impl DummyTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture every submitted job into the shared buffer, for assertions.
    pub fn with_capture(buffer: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        Self {
            capture: Some(buffer),
            ..Self::default()
        }
    }

    /// Make the next `n` submissions fail with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Shared counter handle, so tests can schedule failures after the
    /// transport has been moved into the loop.
    pub fn failure_handle(&self) -> Arc<AtomicUsize> {
        self.fail_remaining.clone()
    }

    /// Run a closure at the start of every submission. Tests use this to
    /// observe the rest of the world at the moment a job reaches the
    /// printer.
    pub fn on_submit(mut self, hook: Box<dyn FnMut(&[u8]) + Send>) -> Self {
        self.on_submit = Some(hook);
        self
    }

    pub fn submit(&mut self, data: &[u8]) -> Result<(), BuzonError> {
        if let Some(hook) = &mut self.on_submit {
            hook(data);
        }
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(BuzonError::Transport("Simulated device failure".to_string()));
        }
        info!("dummy printer: received job ({} bytes)", data.len());
        if let Some(buffer) = &self.capture {
            if let Ok(mut jobs) = buffer.lock() {
                jobs.push(data.to_vec());
            }
        }
        Ok(())
    }
}
