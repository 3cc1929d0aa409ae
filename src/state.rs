//! # Seen-Message Store
//!
//! A bounded, crash-safe record of message ids that have already produced
//! physical output. This is the mechanism that makes printing idempotent
//! across gateway redelivery and process restarts: the retrieval cursor is
//! deliberately kept in memory only, and this file is the durable truth.
//!
//! ## File Format
//!
//! Plain JSON, human-inspectable and safely deletable (deleting it resets
//! history, making anything the gateway still retains eligible again):
//!
//! ```json
//! {"seen_message_ids": ["412883", "412884", "412897"]}
//! ```
//!
//! ## Failure Semantics
//!
//! - Missing, empty, or corrupt file on load: empty history, warn, never
//!   fatal.
//! - Persist failure: logged, in-memory state stays authoritative. A crash
//!   right after leaves a redelivery window bounded by gateway retention.
//! - Persist is write-to-temp-then-rename in the same directory, so a crash
//!   mid-write can never corrupt the previous file.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default)]
struct StateFile {
    seen_message_ids: Vec<String>,
}

/// Bounded FIFO of processed message ids, persisted after every mutation.
pub struct SeenStore {
    path: PathBuf,
    limit: usize,
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl SeenStore {
    /// Load history from `path`. Any read or parse problem degrades to an
    /// empty store; history loss means at worst a bounded reprint, which
    /// beats refusing to start.
    pub fn load(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let limit = limit.max(1);
        let ids = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<StateFile>(&bytes) {
                Ok(state) => state.seen_message_ids,
                Err(e) => {
                    warn!(
                        "State file {} unreadable ({}), starting with empty history",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting fresh", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Could not read state file {} ({}), starting with empty history",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        let mut store = Self {
            path,
            limit,
            order: VecDeque::new(),
            index: HashSet::new(),
        };
        for id in ids {
            store.insert(id);
        }
        store
    }

    /// Whether this id has already been fully processed.
    pub fn has_seen(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Record a processed id. Re-recording a present id is a no-op; when the
    /// limit is exceeded the oldest entries are evicted.
    pub fn record(&mut self, id: &str) {
        self.insert(id.to_string());
    }

    fn insert(&mut self, id: String) {
        if self.index.contains(&id) {
            return;
        }
        self.index.insert(id.clone());
        self.order.push_back(id);
        while self.order.len() > self.limit {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
    }

    /// Number of ids currently held.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in processing order (oldest first).
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Write the current history to disk. Best-effort: failures are logged
    /// and swallowed, because losing one persist only widens the crash
    /// redelivery window; it must not take the service down.
    pub fn persist(&self) {
        if let Err(e) = self.try_persist() {
            error!("Failed to persist state to {}: {}", self.path.display(), e);
        }
    }

    fn try_persist(&self) -> std::io::Result<()> {
        let state = StateFile {
            seen_message_ids: self.order.iter().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&state)?;

        // Temp file in the same directory so the rename stays on one
        // filesystem and is atomic.
        let tmp = temp_sibling(&self.path);
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_in(dir: &tempfile::TempDir, limit: usize) -> SeenStore {
        SeenStore::load(dir.path().join("state.json"), limit)
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 100);
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{ this is not json").unwrap();
        let store = SeenStore::load(&path, 100);
        assert!(store.is_empty());
    }

    #[test]
    fn record_and_has_seen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir, 100);
        assert!(!store.has_seen("A"));
        store.record("A");
        assert!(store.has_seen("A"));
        assert!(!store.has_seen("B"));
    }

    #[test]
    fn record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir, 100);
        store.record("A");
        store.record("A");
        store.record("A");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn fifo_eviction_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir, 3);
        for id in ["1", "2", "3", "4", "5"] {
            store.record(id);
        }
        assert_eq!(store.len(), 3);
        let ids: Vec<&str> = store.ids().collect();
        assert_eq!(ids, vec!["3", "4", "5"]);
        assert!(!store.has_seen("1"));
        assert!(!store.has_seen("2"));
        assert!(store.has_seen("5"));
    }

    #[test]
    fn persist_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        {
            let mut store = SeenStore::load(&path, 100);
            store.record("A");
            store.record("B");
            store.persist();
        }
        let reloaded = SeenStore::load(&path, 100);
        assert!(reloaded.has_seen("A"));
        assert!(reloaded.has_seen("B"));
        assert_eq!(reloaded.ids().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn persisted_file_is_inspectable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = SeenStore::load(&path, 100);
        store.record("412883");
        store.persist();
        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["seen_message_ids"][0], "412883");
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = SeenStore::load(&path, 100);
        store.record("A");
        store.persist();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn limit_applies_on_load_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        {
            let mut store = SeenStore::load(&path, 100);
            for i in 0..10 {
                store.record(&i.to_string());
            }
            store.persist();
        }
        // Reload with a tighter limit: only the newest survive
        let store = SeenStore::load(&path, 4);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["6", "7", "8", "9"]);
    }
}
