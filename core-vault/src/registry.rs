//! Conflict registry.
//!
//! A pure view over the cache snapshot: it holds no state of its own, so it
//! can never drift from the entry list it was derived from.

use crate::cache::MetadataCache;

#[derive(Clone, Debug)]
pub struct ConflictRegistry {
    cache: MetadataCache,
}

impl ConflictRegistry {
    pub fn new(cache: MetadataCache) -> Self {
        Self { cache }
    }

    /// Labels flagged as conflicted, in the order the host listed them.
    /// Empty until the cache has loaded.
    pub fn conflicted_labels(&self) -> Vec<String> {
        self.cache
            .read()
            .entries()
            .iter()
            .filter(|entry| entry.has_conflict)
            .map(|entry| entry.label.clone())
            .collect()
    }

    pub fn is_conflicted(&self, label: &str) -> bool {
        self.cache
            .read()
            .entries()
            .iter()
            .any(|entry| entry.has_conflict && entry.label == label)
    }

    /// Same as [`is_conflicted`](Self::is_conflicted), but against the next
    /// loaded snapshot rather than whatever is current.
    pub async fn is_conflicted_when_loaded(&self, label: &str) -> bool {
        self.cache
            .loaded()
            .await
            .iter()
            .any(|entry| entry.has_conflict && entry.label == label)
    }

    pub fn len(&self) -> usize {
        self.cache
            .read()
            .entries()
            .iter()
            .filter(|entry| entry.has_conflict)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::LedgerClient;
    use crate::error_channel::ErrorChannel;
    use bridge_traits::testing::ScriptedBoundary;
    use bridge_traits::Command;
    use core_runtime::events::EventBus;
    use serde_json::json;
    use std::sync::Arc;

    async fn loaded_registry(list: serde_json::Value) -> ConflictRegistry {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary.respond(Command::List, list);
        let events = EventBus::default();
        let cache = MetadataCache::new(
            LedgerClient::new(boundary),
            ErrorChannel::new(events.clone()),
            events,
        );
        cache.reload().await;
        ConflictRegistry::new(cache)
    }

    #[tokio::test]
    async fn test_empty_before_load() {
        let events = EventBus::default();
        let cache = MetadataCache::new(
            LedgerClient::new(Arc::new(ScriptedBoundary::new())),
            ErrorChannel::new(events.clone()),
            events,
        );
        let registry = ConflictRegistry::new(cache);

        assert!(registry.conflicted_labels().is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_derives_conflicted_labels_in_order() {
        let registry = loaded_registry(json!([
            { "label": "A", "has_conflict": false },
            { "label": "B", "has_conflict": true },
            { "label": "C", "has_conflict": true }
        ]))
        .await;

        for _ in 0..3 {
            assert_eq!(registry.conflicted_labels(), vec!["B", "C"]);
        }
        assert_eq!(registry.len(), 2);
        assert!(registry.is_conflicted("C"));
        assert!(!registry.is_conflicted("A"));
        assert!(!registry.is_conflicted("Z"));
    }
}
