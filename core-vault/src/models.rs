//! Ledger data model as seen by the client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata for one ledger entry. The secret itself is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Unique key of the entry
    pub label: String,
    /// The local and remote copies disagree
    pub has_conflict: bool,
}

impl Entry {
    pub fn new(label: impl Into<String>, has_conflict: bool) -> Self {
        Self {
            label: label.into(),
            has_conflict,
        }
    }
}

/// The two candidate values of a conflicted entry.
///
/// Fetched per resolution attempt and never cached.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPair {
    #[serde(rename = "local_pw")]
    pub local_value: String,
    #[serde(rename = "remote_pw")]
    pub remote_value: String,
}

impl ConflictPair {
    pub fn new(local_value: impl Into<String>, remote_value: impl Into<String>) -> Self {
        Self {
            local_value: local_value.into(),
            remote_value: remote_value.into(),
        }
    }

    /// Both sides hold the same value.
    pub fn is_ambiguous(&self) -> bool {
        self.local_value == self.remote_value
    }
}

impl fmt::Debug for ConflictPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictPair")
            .field("local_value", &"[REDACTED]")
            .field("remote_value", &"[REDACTED]")
            .finish()
    }
}

/// Answer to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Pairing PIN to hand to the downloading device. The legacy upload
    /// command may not return one.
    #[serde(default)]
    pub pin: Option<String>,
}

/// Lifecycle of the entry metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheState {
    /// No fetch has been requested yet
    #[default]
    Unloaded,
    /// A fetch is in flight
    Loading,
    Loaded(Vec<Entry>),
    /// Never the settled state: failed fetches settle as `Loaded` with no entries.
    Failed(String),
}

impl CacheState {
    pub fn is_loading(&self) -> bool {
        matches!(self, CacheState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CacheState::Loaded(_))
    }

    /// Entries of a loaded snapshot; empty for every other state.
    pub fn entries(&self) -> &[Entry] {
        match self {
            CacheState::Loaded(entries) => entries,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_wire_shape() {
        let entries: Vec<Entry> = serde_json::from_value(json!([
            { "label": "mail", "has_conflict": false },
            { "label": "bank", "has_conflict": true }
        ]))
        .unwrap();

        assert_eq!(entries, vec![Entry::new("mail", false), Entry::new("bank", true)]);
    }

    #[test]
    fn test_conflict_pair_uses_wire_names() {
        let pair: ConflictPair =
            serde_json::from_value(json!({ "local_pw": "old", "remote_pw": "new" })).unwrap();
        assert_eq!(pair, ConflictPair::new("old", "new"));
        assert!(!pair.is_ambiguous());
    }

    #[test]
    fn test_conflict_pair_debug_is_redacted() {
        let rendered = format!("{:?}", ConflictPair::new("hunter2", "hunter3"));
        assert!(!rendered.contains("hunter"));
    }

    #[test]
    fn test_upload_receipt_pin_is_optional() {
        let receipt: UploadReceipt = serde_json::from_value(json!({ "pin": "4821" })).unwrap();
        assert_eq!(receipt.pin.as_deref(), Some("4821"));

        let receipt: UploadReceipt = serde_json::from_value(json!({})).unwrap();
        assert_eq!(receipt.pin, None);
    }

    #[test]
    fn test_cache_state_entries() {
        assert!(CacheState::Unloaded.entries().is_empty());
        assert!(CacheState::Loading.is_loading());
        let state = CacheState::Loaded(vec![Entry::new("a", false)]);
        assert!(state.is_loaded());
        assert_eq!(state.entries().len(), 1);
    }
}
