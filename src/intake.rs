//! # Intake Loop
//!
//! The single-actor pipeline that ties the crate together: poll the
//! gateway, filter and dedup each message, render it into an
//! [`OutputJob`](crate::job::OutputJob), and submit the bytes to the
//! printer transport.
//!
//! One logical actor owns every piece of mutable state (the dedup store,
//! the gateway cursor, the transport handle), so there is no locking and
//! no ordering ambiguity: messages are handled strictly in the order the
//! gateway delivered them.
//!
//! ## Failure containment
//!
//! Every failure is scoped to the smallest unit it affects:
//!
//! | failure            | scope                | loop keeps running? |
//! |--------------------|----------------------|---------------------|
//! | gateway fetch      | one poll iteration   | yes (backoff)       |
//! | printer open       | one poll iteration   | yes (retry delay)   |
//! | attachment decode  | one attachment       | yes (text-only)     |
//! | submit             | one message          | yes (handle reset)  |
//!
//! A message that failed to print is *not* recorded as seen, so it is
//! retried on redelivery. A denied message is not recorded either: if the
//! allowlist later grows, previously blocked mail becomes printable.

use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::allowlist::{Allowlist, ContactBook};
use crate::gateway::{Message, MessageGateway};
use crate::job::OutputJob;
use crate::render::photo;
use crate::render::RasterBlock;
use crate::state::SeenStore;
use crate::status::StatusSink;
use crate::transport::{PrinterTransport, TransportConfig};

/// Delay before retrying after a failed printer open.
const RECONNECT_DELAY: Duration = Duration::from_secs(10);
/// Fetch attempts per poll iteration before giving the iteration up.
const FETCH_ATTEMPTS: u32 = 4;
/// Base delay of the fetch backoff schedule.
const BACKOFF_BASE_SECS: u64 = 1;
/// Ceiling of the fetch backoff schedule.
const BACKOFF_CAP_SECS: u64 = 30;

/// Rendering and filtering knobs for the loop, fixed at startup.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    /// Banner text at the top of every printout.
    pub header_text: String,
    /// Printer text width in characters.
    pub line_width: usize,
    /// Printer raster width in pixels.
    pub raster_width: u16,
    /// Attachments per message beyond this are dropped.
    pub max_attachments: usize,
    /// Attachment blobs larger than this are dropped without decoding.
    pub max_attachment_bytes: u64,
}

/// How one message left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Rendered and submitted to the printer; recorded as seen and
    /// persisted before the next message is handled.
    Printed,
    /// Already in the seen store, skipped.
    Duplicate,
    /// Sender not on the allowlist, skipped and not recorded.
    Denied,
    /// Submission failed, not recorded so redelivery retries it.
    Failed,
    /// No printer handle could be opened, not recorded.
    NoPrinter,
}

/// The poll-filter-print actor. Owns the gateway, the dedup store and
/// the (optional) transport handle for its whole lifetime.
pub struct IntakeLoop<G: MessageGateway> {
    gateway: G,
    allowlist: Allowlist,
    contacts: ContactBook,
    seen: SeenStore,
    transport_config: TransportConfig,
    transport: Option<PrinterTransport>,
    status: Option<Box<dyn StatusSink>>,
    settings: IntakeSettings,
}

impl<G: MessageGateway> IntakeLoop<G> {
    pub fn new(
        gateway: G,
        allowlist: Allowlist,
        contacts: ContactBook,
        seen: SeenStore,
        transport_config: TransportConfig,
        settings: IntakeSettings,
    ) -> Self {
        IntakeLoop {
            gateway,
            allowlist,
            contacts,
            seen,
            transport_config,
            transport: None,
            status: None,
            settings,
        }
    }

    /// Attach a status sink, notified after each batch that printed mail.
    pub fn with_status(mut self, sink: Box<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Start with an already-open transport handle instead of opening one
    /// from the config on the first iteration.
    pub fn with_transport(mut self, transport: PrinterTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run until `shutdown` flips to `true`. Never returns early on its
    /// own: every gateway, printer and render failure is contained.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Intake loop started ({} permitted sender(s), {} message(s) already seen)",
            self.allowlist.len(),
            self.seen.len()
        );
        if self.allowlist.permits_everyone() {
            warn!("Allowlist is empty: ALL senders are permitted");
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Check for a printer before polling: with nothing to print
            // on, fetching would only consume messages we cannot output.
            if self.transport.is_none() {
                self.transport = PrinterTransport::open(&self.transport_config);
                if self.transport.is_none() {
                    warn!(
                        "Printer unavailable, retrying in {}s",
                        RECONNECT_DELAY.as_secs()
                    );
                    if wait_or_shutdown(&mut shutdown, RECONNECT_DELAY).await {
                        break;
                    }
                    continue;
                }
            }

            let batch = match self.fetch_with_backoff(&mut shutdown).await {
                Some(batch) => batch,
                None => continue, // exhausted or shutting down; loop top decides
            };

            if !batch.is_empty() {
                debug!("Fetched {} message(s)", batch.len());
            }
            let mut printed = 0usize;
            let mut last_sender: Option<String> = None;
            for message in &batch {
                let label = self.sender_label(message);
                match self.handle_message(message, &label) {
                    Outcome::Printed => {
                        info!("Printed message {} from {}", message.id, label);
                        printed += 1;
                        last_sender = Some(label);
                    }
                    Outcome::Duplicate => {
                        debug!("Skipping already-seen message {}", message.id);
                    }
                    Outcome::Denied => {
                        warn!(
                            "Denied message {} from unpermitted sender {}",
                            message.id, message.sender_id
                        );
                    }
                    Outcome::Failed => {
                        error!(
                            "Print failed for message {}; will retry on redelivery",
                            message.id
                        );
                    }
                    Outcome::NoPrinter => {
                        warn!(
                            "No printer for message {}; will retry on redelivery",
                            message.id
                        );
                    }
                }
            }
            if printed > 0 {
                if let Some(sink) = &self.status {
                    sink.batch_printed(printed, last_sender.as_deref());
                }
            }
        }

        info!("Intake loop stopped");
    }

    /// Classify and (when appropriate) print a single message. Pure with
    /// respect to the rest of the batch: one message's outcome never
    /// touches another's.
    fn handle_message(&mut self, message: &Message, label: &str) -> Outcome {
        if !self.allowlist.is_permitted(&message.sender_id) {
            return Outcome::Denied;
        }
        if self.seen.has_seen(&message.id) {
            return Outcome::Duplicate;
        }

        let rasters = self.render_attachments(message);
        let job = OutputJob::receipt(
            &self.settings.header_text,
            &message.received_at.format("%Y-%m-%d %H:%M").to_string(),
            label,
            &message.text,
            &rasters,
            self.settings.line_width,
        );
        let bytes = job.encode();

        // A submit failure earlier in this batch drops the handle;
        // reopen here so the rest of the batch still prints.
        if self.transport.is_none() {
            self.transport = PrinterTransport::open(&self.transport_config);
        }
        let Some(transport) = self.transport.as_mut() else {
            return Outcome::NoPrinter;
        };
        match transport.submit(&bytes) {
            Ok(()) => {
                // Durable before the next message is touched: a crash
                // later in the batch must not reprint this one.
                self.seen.record(&message.id);
                self.seen.persist();
                Outcome::Printed
            }
            Err(err) => {
                error!("Printer submit failed: {err}");
                // The handle may be wedged mid-job; drop it and reopen
                // fresh before the next message.
                self.transport = None;
                Outcome::Failed
            }
        }
    }

    /// Decode each attachment into a raster, dropping the ones that fail
    /// or exceed the per-message cap. Never fails the message itself.
    fn render_attachments(&self, message: &Message) -> Vec<RasterBlock> {
        if message.attachments.len() > self.settings.max_attachments {
            warn!(
                "Message {} has {} attachments, keeping first {}",
                message.id,
                message.attachments.len(),
                self.settings.max_attachments
            );
        }
        let mut rasters = Vec::new();
        for blob in message.attachments.iter().take(self.settings.max_attachments) {
            // The gateway caps downloads too, but the bound belongs here:
            // no gateway impl gets to hand the decoder an unbounded blob.
            if blob.len() as u64 > self.settings.max_attachment_bytes {
                warn!(
                    "Dropping oversized attachment on message {} ({} bytes, cap {})",
                    message.id,
                    blob.len(),
                    self.settings.max_attachment_bytes
                );
                continue;
            }
            match photo::convert(blob, self.settings.raster_width) {
                Ok(block) => rasters.push(block),
                Err(err) => {
                    warn!(
                        "Dropping undecodable attachment on message {}: {err}",
                        message.id
                    );
                }
            }
        }
        rasters
    }

    fn sender_label(&self, message: &Message) -> String {
        if self.contacts.name_for(&message.sender_id).is_some() {
            return self.contacts.label(&message.sender_id);
        }
        match &message.sender_name {
            Some(name) => format!("{} ({})", name, message.sender_id),
            None => message.sender_id.clone(),
        }
    }

    /// Poll the gateway, retrying transient failures with capped
    /// exponential backoff. `None` means the attempts ran out (or a
    /// shutdown arrived mid-wait) and the iteration should be skipped.
    async fn fetch_with_backoff(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Vec<Message>> {
        for attempt in 0..FETCH_ATTEMPTS {
            match self.gateway.fetch().await {
                Ok(batch) => return Some(batch),
                Err(err) if attempt + 1 == FETCH_ATTEMPTS => {
                    warn!(
                        "Gateway fetch failed (attempt {}/{}): {err}",
                        attempt + 1,
                        FETCH_ATTEMPTS
                    );
                }
                Err(err) => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "Gateway fetch failed (attempt {}/{}): {err}; retrying in {}s",
                        attempt + 1,
                        FETCH_ATTEMPTS,
                        delay.as_secs()
                    );
                    if wait_or_shutdown(shutdown, delay).await {
                        return None;
                    }
                }
            }
        }
        error!(
            "Gateway unreachable after {} attempts, skipping this iteration",
            FETCH_ATTEMPTS
        );
        None
    }

    /// Read access for tests and shutdown persistence.
    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let secs = BACKOFF_BASE_SECS
        .saturating_mul(1u64 << attempt.min(63))
        .min(BACKOFF_CAP_SECS);
    Duration::from_secs(secs)
}

/// Sleep for `delay`, waking early if the shutdown flag flips. Returns
/// `true` when the caller should stop.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    tokio::select! {
        _ = sleep(delay) => false,
        _ = shutdown.changed() => *shutdown.borrow(),
    }
}
