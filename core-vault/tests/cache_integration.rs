//! Integration tests for the metadata cache and conflict registry

use bridge_traits::error::BridgeError;
use bridge_traits::testing::ScriptedBoundary;
use bridge_traits::Command;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, EventStream};
use core_vault::{CacheState, ConflictRegistry, Entry, ErrorChannel, LedgerClient, MetadataCache};
use serde_json::json;
use std::sync::Arc;

struct Session {
    boundary: Arc<ScriptedBoundary>,
    events: EventBus,
    errors: ErrorChannel,
    cache: MetadataCache,
    registry: ConflictRegistry,
}

fn session() -> Session {
    let boundary = Arc::new(ScriptedBoundary::new());
    let events = EventBus::new(64);
    let errors = ErrorChannel::new(events.clone());
    let cache = MetadataCache::new(
        LedgerClient::new(boundary.clone()),
        errors.clone(),
        events.clone(),
    );
    let registry = ConflictRegistry::new(cache.clone());
    Session {
        boundary,
        events,
        errors,
        cache,
        registry,
    }
}

#[tokio::test]
async fn repeated_load_issues_one_fetch() {
    let s = session();
    s.boundary.respond(Command::List, json!([]));

    for _ in 0..10 {
        s.cache.load();
    }
    s.cache.settled().await;
    for _ in 0..10 {
        s.cache.load();
    }

    assert_eq!(s.boundary.call_count(Command::List), 1);
}

#[tokio::test]
async fn list_failure_surfaces_message_and_settles_empty() {
    let s = session();
    s.boundary
        .fail(Command::List, BridgeError::from_payload(json!("network down")));

    s.cache.load();
    assert_eq!(s.cache.settled().await, CacheState::Loaded(Vec::new()));
    assert_eq!(s.errors.latest().as_deref(), Some("network down"));
    assert!(s.registry.conflicted_labels().is_empty());
}

#[tokio::test]
async fn registry_tracks_refreshes() {
    let s = session();
    s.boundary.respond(
        Command::List,
        json!([
            { "label": "A", "has_conflict": false },
            { "label": "B", "has_conflict": true },
            { "label": "C", "has_conflict": true }
        ]),
    );

    s.cache.load();
    s.cache.settled().await;
    assert_eq!(s.registry.conflicted_labels(), vec!["B", "C"]);
    assert_eq!(s.registry.conflicted_labels(), vec!["B", "C"]);

    s.boundary.respond(
        Command::List,
        json!([
            { "label": "A", "has_conflict": false },
            { "label": "C", "has_conflict": true }
        ]),
    );
    s.cache.reload().await;
    assert_eq!(s.registry.conflicted_labels(), vec!["C"]);
}

#[tokio::test]
async fn duplicate_labels_keep_first_occurrence() {
    let s = session();
    s.boundary.respond(
        Command::List,
        json!([
            { "label": "mail", "has_conflict": true },
            { "label": "mail", "has_conflict": false }
        ]),
    );

    let state = s.cache.reload().await;
    assert_eq!(state, CacheState::Loaded(vec![Entry::new("mail", true)]));
}

#[tokio::test]
async fn superseded_fetch_is_reported_as_stale() {
    let s = session();
    let mut stream = EventStream::new(s.events.subscribe())
        .filter(|event| {
            matches!(
                event,
                CoreEvent::Cache(CacheEvent::StaleResponseDiscarded { .. })
            )
        });
    s.boundary
        .respond_once(Command::List, Ok(json!([{ "label": "old", "has_conflict": false }])))
        .respond(Command::List, json!([{ "label": "new", "has_conflict": false }]));
    let gate = s.boundary.hold(Command::List, None);

    let first = s.cache.refresh();
    s.boundary.wait_for_calls(Command::List, 1).await;
    let second = s.cache.refresh();
    s.boundary.wait_for_calls(Command::List, 2).await;
    gate.release();

    assert_eq!(
        s.cache.settled().await,
        CacheState::Loaded(vec![Entry::new("new", false)])
    );
    assert!(second > first);
    assert_eq!(
        stream.recv().await.unwrap(),
        CoreEvent::Cache(CacheEvent::StaleResponseDiscarded { generation: first })
    );
}
