//! # Sender Admission and Contact Names
//!
//! [`Allowlist`] decides whether a sender may cause physical output;
//! [`ContactBook`] maps opaque sender ids to household names for the
//! receipt header. Both are pure values built once from configuration —
//! no I/O after construction.
//!
//! ## The Empty-Allowlist Fallback
//!
//! An *empty* allowlist permits **everyone**. This is a deliberate
//! out-of-box convenience (first boot prints immediately, before any
//! configuration exists), not an oversight — but it does mean an
//! unconfigured device will print whatever strangers send it. Startup logs
//! a warning whenever the permissive mode is active.

use std::collections::{BTreeMap, HashSet};

/// The set of sender ids permitted to print.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    permitted: HashSet<String>,
}

impl Allowlist {
    pub fn new(permitted: HashSet<String>) -> Self {
        Self { permitted }
    }

    /// Parse the comma-separated configuration form: `"+1555...,+1444..."`.
    /// Blank entries are skipped.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Whether this sender may cause physical output.
    ///
    /// Empty set = permit all (see module docs).
    pub fn is_permitted(&self, sender_id: &str) -> bool {
        self.permitted.is_empty() || self.permitted.contains(sender_id)
    }

    /// True when the permissive empty-set fallback is active.
    pub fn permits_everyone(&self) -> bool {
        self.permitted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.permitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permitted.is_empty()
    }
}

/// Read-only display-name mapping for sender ids.
#[derive(Debug, Clone, Default)]
pub struct ContactBook {
    // name -> id, as configured; kept sorted for stable iteration
    contacts: BTreeMap<String, String>,
}

impl ContactBook {
    pub fn new(contacts: BTreeMap<String, String>) -> Self {
        Self { contacts }
    }

    /// Parse the configuration form `"grandma:+15551112222,uncle:+1555333"`.
    /// Chunks without a colon, or with a blank side, are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut contacts = BTreeMap::new();
        for chunk in raw.split(',') {
            if let Some((name, id)) = chunk.split_once(':') {
                let (name, id) = (name.trim(), id.trim());
                if !name.is_empty() && !id.is_empty() {
                    contacts.insert(name.to_string(), id.to_string());
                }
            }
        }
        Self { contacts }
    }

    /// The configured name for a sender id, if any.
    pub fn name_for(&self, sender_id: &str) -> Option<&str> {
        self.contacts
            .iter()
            .find(|(_, id)| id.as_str() == sender_id)
            .map(|(name, _)| name.as_str())
    }

    /// Receipt label for a sender: `"grandma (+1555...)"` when known,
    /// otherwise the raw id.
    pub fn label(&self, sender_id: &str) -> String {
        match self.name_for(sender_id) {
            Some(name) => format!("{} ({})", name, sender_id),
            None => sender_id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
