//! # Entry Metadata Cache
//!
//! Lazily loaded snapshot of the ledger's entry list (labels and conflict
//! flags, never secrets).
//!
//! ## Loading
//!
//! - [`MetadataCache::load`] issues the first list fetch and is a no-op
//!   afterwards.
//! - [`MetadataCache::refresh`] always issues a new fetch. A fetch that was
//!   already in flight is superseded: its response is discarded when it
//!   arrives.
//! - [`MetadataCache::reload`] refreshes and waits for the result.
//!
//! Fetches run on the Tokio runtime, so `load` and `refresh` must be called
//! from within one.
//!
//! ## Failure policy
//!
//! A failed fetch reports its message to the [`ErrorChannel`] and the cache
//! settles as `Loaded` with no entries. The cache never settles as `Failed`.

use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::commands::LedgerClient;
use crate::error_channel::ErrorChannel;
use crate::models::{CacheState, Entry};

#[derive(Default)]
struct FetchTracker {
    requested: bool,
    generation: u64,
}

struct Inner {
    client: LedgerClient,
    errors: ErrorChannel,
    events: EventBus,
    fetch: Mutex<FetchTracker>,
    state: watch::Sender<CacheState>,
}

#[derive(Clone)]
pub struct MetadataCache {
    inner: Arc<Inner>,
}

impl MetadataCache {
    pub fn new(client: LedgerClient, errors: ErrorChannel, events: EventBus) -> Self {
        let (state, _) = watch::channel(CacheState::Unloaded);
        Self {
            inner: Arc::new(Inner {
                client,
                errors,
                events,
                fetch: Mutex::new(FetchTracker::default()),
                state,
            }),
        }
    }

    /// Start the first fetch if none was ever requested. Returns the current
    /// state without waiting.
    pub fn load(&self) -> CacheState {
        let mut fetch = self.inner.fetch.lock();
        if !fetch.requested {
            self.start_fetch(&mut fetch);
        }
        drop(fetch);
        self.read()
    }

    /// Start a new fetch, superseding any in flight. Returns its generation.
    pub fn refresh(&self) -> u64 {
        let mut fetch = self.inner.fetch.lock();
        self.start_fetch(&mut fetch)
    }

    /// Refresh and wait until the cache settles.
    pub async fn reload(&self) -> CacheState {
        self.refresh();
        self.settled().await
    }

    pub fn read(&self) -> CacheState {
        self.inner.state.borrow().clone()
    }

    /// Entries of the current snapshot; empty unless loaded.
    pub fn entries(&self) -> Vec<Entry> {
        self.inner.state.borrow().entries().to_vec()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.inner.state.subscribe()
    }

    /// Wait for the next state that is not `Loading`.
    pub async fn settled(&self) -> CacheState {
        let mut rx = self.inner.state.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| rx.borrow().clone())
    }

    /// Entries of the next `Loaded` snapshot, starting the first fetch if
    /// none was requested. Waits out any refresh in flight.
    pub async fn loaded(&self) -> Vec<Entry> {
        self.load();
        let mut rx = self.inner.state.subscribe();
        let loaded = match rx.wait_for(CacheState::is_loaded).await {
            Ok(state) => Some(state.entries().to_vec()),
            Err(_) => None,
        };
        // The sender lives in `inner`, so the channel cannot close here.
        loaded.unwrap_or_default()
    }

    fn start_fetch(&self, fetch: &mut FetchTracker) -> u64 {
        fetch.requested = true;
        fetch.generation += 1;
        let generation = fetch.generation;

        self.inner.state.send_replace(CacheState::Loading);
        self.inner
            .events
            .emit(CoreEvent::Cache(CacheEvent::FetchStarted { generation }))
            .ok();
        debug!(generation, "entry list fetch started");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.client.list().await;
            inner.settle(generation, result);
        });

        generation
    }
}

impl Inner {
    fn settle(&self, generation: u64, result: bridge_traits::error::Result<Vec<Entry>>) {
        let fetch = self.fetch.lock();
        if fetch.generation != generation {
            debug!(
                generation,
                current = fetch.generation,
                "discarding superseded entry list"
            );
            self.events
                .emit(CoreEvent::Cache(CacheEvent::StaleResponseDiscarded {
                    generation,
                }))
                .ok();
            return;
        }

        let entries = match result {
            Ok(entries) => {
                let entries = dedupe_labels(entries);
                let conflict_count = entries.iter().filter(|e| e.has_conflict).count();
                info!(
                    generation,
                    entry_count = entries.len(),
                    conflict_count,
                    "entry list loaded"
                );
                self.events
                    .emit(CoreEvent::Cache(CacheEvent::Loaded {
                        generation,
                        entry_count: entries.len(),
                        conflict_count,
                    }))
                    .ok();
                entries
            }
            Err(err) => {
                let message = err.message();
                self.errors.report(message.clone());
                self.events
                    .emit(CoreEvent::Cache(CacheEvent::FetchFailed {
                        generation,
                        message,
                    }))
                    .ok();
                Vec::new()
            }
        };

        self.state.send_replace(CacheState::Loaded(entries));
    }
}

/// Keep the first occurrence of each label.
fn dedupe_labels(entries: Vec<Entry>) -> Vec<Entry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| {
            let first = seen.insert(entry.label.clone());
            if !first {
                warn!(label = %entry.label, "duplicate label in entry list, keeping first");
            }
            first
        })
        .collect()
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
