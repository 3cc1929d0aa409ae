//! End-to-end intake tests: a scripted gateway feeds batches into the
//! loop, a capturing dummy transport records what would hit the paper,
//! and the seen store persists to a temp file between "restarts".

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use buzon::allowlist::{Allowlist, ContactBook};
use buzon::error::BuzonError;
use buzon::gateway::{Message, MessageGateway};
use buzon::intake::{IntakeLoop, IntakeSettings};
use buzon::state::SeenStore;
use buzon::status::StatusSink;
use buzon::transport::{DummyTransport, PrinterTransport, TransportConfig};

/// Delivers a fixed script of fetch results, then flips the shutdown
/// flag so the loop exits.
struct ScriptedGateway {
    batches: VecDeque<Result<Vec<Message>, BuzonError>>,
    shutdown: watch::Sender<bool>,
}

impl ScriptedGateway {
    fn new(
        batches: Vec<Result<Vec<Message>, BuzonError>>,
    ) -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            ScriptedGateway {
                batches: batches.into(),
                shutdown: tx,
            },
            rx,
        )
    }
}

#[async_trait]
impl MessageGateway for ScriptedGateway {
    async fn fetch(&mut self) -> Result<Vec<Message>, BuzonError> {
        match self.batches.pop_front() {
            Some(result) => result,
            None => {
                let _ = self.shutdown.send(true);
                Ok(Vec::new())
            }
        }
    }
}

/// Records every batch notification for later assertions.
#[derive(Clone, Default)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<(usize, Option<String>)>>>,
}

impl StatusSink for RecordingSink {
    fn batch_printed(&self, new_count: usize, last_sender: Option<&str>) {
        self.calls
            .lock()
            .unwrap()
            .push((new_count, last_sender.map(String::from)));
    }
}

fn msg(id: &str, sender: &str, text: &str) -> Message {
    Message {
        id: id.to_string(),
        sender_id: sender.to_string(),
        sender_name: None,
        text: text.to_string(),
        attachments: Vec::new(),
        received_at: Utc::now(),
    }
}

fn settings() -> IntakeSettings {
    IntakeSettings {
        header_text: "BUZON".to_string(),
        line_width: 32,
        raster_width: 384,
        max_attachments: 3,
        max_attachment_bytes: 5 * 1024 * 1024,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// `GS v 0` raster frame marker; one per printed image.
const RASTER_HEADER: &[u8] = &[0x1D, 0x76, 0x30, 0x00];

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn gray_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    use std::io::Cursor;
    let img = image::ImageBuffer::from_pixel(width, height, image::Luma([value]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn new_message_prints_once_and_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![msg("A", "111", "hi there")])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::default();

    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::parse("grandma:111"),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )))
    .with_status(Box::new(sink.clone()));

    intake.run(shutdown).await;

    let jobs = capture.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(contains(&jobs[0], b"hi there"));
    assert!(contains(&jobs[0], b"grandma (111)"));

    let reloaded = SeenStore::load(&state_path, 100);
    assert!(reloaded.has_seen("A"));

    let calls = sink.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[(1, Some("grandma (111)".to_string()))]);
}

#[tokio::test]
async fn redelivery_after_restart_prints_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    // First run prints and persists.
    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![msg("A", "111", "hello")])]);
    let first = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        first.clone(),
    )));
    intake.run(shutdown).await;
    assert_eq!(first.lock().unwrap().len(), 1);

    // Second process, same state file, gateway redelivers the same id.
    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![msg("A", "111", "hello")])]);
    let second = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        second.clone(),
    )));
    intake.run(shutdown).await;

    assert!(second.lock().unwrap().is_empty());
    assert!(SeenStore::load(&state_path, 100).has_seen("A"));
}

#[tokio::test]
async fn denied_sender_is_skipped_and_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![
        msg("B", "999", "let me in"),
        msg("A", "111", "family mail"),
    ])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    let jobs = capture.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(contains(&jobs[0], b"family mail"));
    assert!(!contains(&jobs[0], b"let me in"));

    // Denied mail is not marked seen: a later allowlist change can
    // still let a redelivery through.
    let reloaded = SeenStore::load(&state_path, 100);
    assert!(reloaded.has_seen("A"));
    assert!(!reloaded.has_seen("B"));
}

#[tokio::test]
async fn empty_allowlist_permits_everyone() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) =
        ScriptedGateway::new(vec![Ok(vec![msg("A", "424242", "anyone home?")])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::default(),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    assert_eq!(capture.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn submit_failure_spares_the_rest_of_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![
        msg("A", "111", "first"),
        msg("B", "111", "second"),
    ])]);
    let transport = DummyTransport::new();
    transport.fail_next(1);
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(transport));
    intake.run(shutdown).await;

    // "A" hit the failure and stays unrecorded for a redelivery retry.
    // "B" printed on the reopened handle.
    let reloaded = SeenStore::load(&state_path, 100);
    assert!(!reloaded.has_seen("A"));
    assert!(reloaded.has_seen("B"));
}

#[tokio::test(start_paused = true)]
async fn gateway_error_backs_off_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) = ScriptedGateway::new(vec![
        Err(BuzonError::Gateway("connection reset".to_string())),
        Ok(vec![msg("A", "111", "finally")]),
    ]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    assert_eq!(capture.lock().unwrap().len(), 1);
    assert!(SeenStore::load(&state_path, 100).has_seen("A"));
}

#[tokio::test]
async fn undecodable_attachment_degrades_to_text() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let mut message = msg("A", "111", "photo attached");
    message.attachments.push(vec![0xde, 0xad, 0xbe, 0xef]);

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![message])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    let jobs = capture.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(contains(&jobs[0], b"photo attached"));
    assert!(SeenStore::load(&state_path, 100).has_seen("A"));
}

#[tokio::test]
async fn printed_message_is_durable_before_the_next_is_handled() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![
        msg("A", "111", "first"),
        msg("B", "111", "second"),
    ])]);

    // Snapshot the on-disk history at the moment each job reaches the
    // printer. A crash while handling "B" must not cost "A" its record.
    let snapshots: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let observer = snapshots.clone();
    let observed_path = state_path.clone();
    let transport = DummyTransport::new().on_submit(Box::new(move |_| {
        let store = SeenStore::load(&observed_path, 100);
        let ids: Vec<String> = store.ids().map(String::from).collect();
        observer.lock().unwrap().push(ids);
    }));

    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(transport));
    intake.run(shutdown).await;

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 2);
    // Before "A" is submitted nothing is recorded yet.
    assert!(!snapshots[0].contains(&"A".to_string()));
    // By the time "B" is submitted, "A" is already on disk.
    assert!(snapshots[1].contains(&"A".to_string()));
}

#[tokio::test]
async fn attachment_count_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let mut message = msg("A", "111", "holiday album");
    for _ in 0..5 {
        message.attachments.push(gray_png(8, 8, 200));
    }

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![message])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut config = settings();
    config.max_attachments = 3;
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        config,
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    let jobs = capture.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(count_occurrences(&jobs[0], RASTER_HEADER), 3);
}

#[tokio::test]
async fn oversized_attachment_is_dropped_without_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let mut message = msg("A", "111", "huge photo");
    message.attachments.push(gray_png(32, 32, 200));

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![message])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut config = settings();
    config.max_attachment_bytes = 16; // every real image is bigger
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        config,
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    let jobs = capture.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(count_occurrences(&jobs[0], RASTER_HEADER), 0);
    assert!(contains(&jobs[0], b"huge photo"));
    assert!(SeenStore::load(&state_path, 100).has_seen("A"));
}

#[tokio::test(start_paused = true)]
async fn exhausted_fetch_gives_up_without_a_final_wait() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    // Four straight failures exhaust the attempts for one iteration.
    let (gateway, shutdown) = ScriptedGateway::new(vec![
        Err(BuzonError::Gateway("down".to_string())),
        Err(BuzonError::Gateway("down".to_string())),
        Err(BuzonError::Gateway("down".to_string())),
        Err(BuzonError::Gateway("down".to_string())),
    ]);
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::new()));

    let started = tokio::time::Instant::now();
    intake.run(shutdown).await;

    // Backoff waits between attempts are 1+2+4 = 7s; no extra 8s wait
    // after the last attempt has already failed.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(7), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(8), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn messages_print_in_gateway_order() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("seen.json");

    let (gateway, shutdown) = ScriptedGateway::new(vec![Ok(vec![
        msg("1", "111", "uno"),
        msg("2", "111", "dos"),
        msg("3", "111", "tres"),
    ])]);
    let capture = Arc::new(Mutex::new(Vec::new()));
    let mut intake = IntakeLoop::new(
        gateway,
        Allowlist::parse("111"),
        ContactBook::default(),
        SeenStore::load(&state_path, 100),
        TransportConfig::Dummy,
        settings(),
    )
    .with_transport(PrinterTransport::Dummy(DummyTransport::with_capture(
        capture.clone(),
    )));
    intake.run(shutdown).await;

    let jobs = capture.lock().unwrap();
    assert_eq!(jobs.len(), 3);
    assert!(contains(&jobs[0], b"uno"));
    assert!(contains(&jobs[1], b"dos"));
    assert!(contains(&jobs[2], b"tres"));
}
