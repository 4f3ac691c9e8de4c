//! # Event Bus System
//!
//! Provides an event-driven notification channel for the ledger client core using
//! `tokio::sync::broadcast`. State changes in the cache, the conflict flow and
//! the sync gate are published here so hosts can observe them without polling.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies per component
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Metadata     ├──────────────>│           │
//! │ Cache        │               │           │
//! └──────────────┘               │ EventBus  │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │ (broadcast├─────────────────>│ Subscriber │
//! │ Conflict     ├──────────────>│  channel) │                  └────────────┘
//! │ Flow         │               │           │
//! └──────────────┘               │           │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │           ├─────────────────>│ Subscriber │
//! │ Sync Gate    ├──────────────>│           │                  └────────────┘
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncDirection, SyncEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Started {
//!         direction: SyncDirection::Upload,
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! Subscribers that fall behind receive `RecvError::Lagged(n)` and may keep
//! reading; `RecvError::Closed` means every sender is gone. Emitting with no
//! subscribers returns an error that publishers ignore (`.ok()`).
//!
//! Event payloads never carry secret values, only labels and messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Session(SessionEvent),
    Cache(CacheEvent),
    Conflict(ConflictEvent),
    Sync(SyncEvent),
    Error(ErrorEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Conflict(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Error(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Error(_) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::FetchFailed { .. }) => EventSeverity::Error,
            CoreEvent::Conflict(ConflictEvent::ResolveFailed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Rejected { .. }) => EventSeverity::Warning,
            CoreEvent::Session(_) => EventSeverity::Info,
            CoreEvent::Conflict(ConflictEvent::Resolved { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// The host accepted the master password and opened the ledger.
    Opened {
        session_id: String,
        ledger_name: String,
    },
    /// The session was closed by the host application.
    Closed { session_id: String },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Opened { .. } => "Ledger session opened",
            SessionEvent::Closed { .. } => "Ledger session closed",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted by the entry metadata cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A list fetch was issued.
    FetchStarted { generation: u64 },
    /// A list fetch completed and replaced the snapshot.
    Loaded {
        generation: u64,
        entry_count: usize,
        conflict_count: usize,
    },
    /// A list fetch failed; the cache settled empty.
    FetchFailed { generation: u64, message: String },
    /// A list fetch finished after a newer one had been issued.
    StaleResponseDiscarded { generation: u64 },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::FetchStarted { .. } => "Fetching entry list",
            CacheEvent::Loaded { .. } => "Entry list loaded",
            CacheEvent::FetchFailed { .. } => "Entry list fetch failed",
            CacheEvent::StaleResponseDiscarded { .. } => "Discarded superseded entry list",
        }
    }
}

// ============================================================================
// Conflict Events
// ============================================================================

/// Events emitted by the conflict resolution flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConflictEvent {
    /// A label was revealed and its candidate pair requested.
    Revealed { label: String },
    /// The candidate pair for the revealed label arrived.
    PairReady { label: String },
    /// A candidate pair fetch failed.
    PairFailed { label: String, message: String },
    /// A resolution commit was sent.
    Resolving { label: String, keep_original: bool },
    /// The host accepted the resolution.
    Resolved { label: String, keep_original: bool },
    /// The host rejected the resolution.
    ResolveFailed { label: String, message: String },
    /// A response arrived for a label that is no longer revealed.
    StaleResponseDiscarded { label: String },
}

impl ConflictEvent {
    fn description(&self) -> &str {
        match self {
            ConflictEvent::Revealed { .. } => "Conflict revealed",
            ConflictEvent::PairReady { .. } => "Conflict candidates ready",
            ConflictEvent::PairFailed { .. } => "Failed to fetch conflict candidates",
            ConflictEvent::Resolving { .. } => "Resolving conflict",
            ConflictEvent::Resolved { .. } => "Conflict resolved",
            ConflictEvent::ResolveFailed { .. } => "Conflict resolution failed",
            ConflictEvent::StaleResponseDiscarded { .. } => "Discarded stale conflict response",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Direction of a sync round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Upload,
    Download,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Upload => "upload",
            SyncDirection::Download => "download",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted by the sync gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    Started { direction: SyncDirection },
    Completed { direction: SyncDirection },
    Failed {
        direction: SyncDirection,
        message: String,
    },
    /// A trigger arrived while another transfer was in progress.
    Rejected { direction: SyncDirection },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Rejected { .. } => "Sync already in progress",
        }
    }
}

// ============================================================================
// Error Events
// ============================================================================

/// Mirrors writes to the shared error slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ErrorEvent {
    Reported { message: String },
    Cleared,
}

impl ErrorEvent {
    fn description(&self) -> &str {
        match self {
            ErrorEvent::Reported { .. } => "Error reported",
            ErrorEvent::Cleared => "Error cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cloning the bus is cheap; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall more than `capacity` events behind receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let conflicts = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Conflict(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Receives a buffered event without waiting. Returns `None` when empty.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every buffered event that passes the filter.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(Ok(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(label: &str) -> CoreEvent {
        CoreEvent::Conflict(ConflictEvent::Resolved {
            label: label.to_string(),
            keep_original: true,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(resolved("mail")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Sync(SyncEvent::Started {
            direction: SyncDirection::Download,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Conflict(_)));

        bus.emit(CoreEvent::Cache(CacheEvent::FetchStarted { generation: 1 }))
            .ok();
        bus.emit(resolved("bank")).ok();

        assert_eq!(stream.recv().await.unwrap(), resolved("bank"));
    }

    #[tokio::test]
    async fn test_drain_collects_buffered_events() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        for generation in 1..=3 {
            bus.emit(CoreEvent::Cache(CacheEvent::FetchStarted { generation }))
                .ok();
        }

        assert_eq!(stream.drain().len(), 3);
        assert!(stream.drain().is_empty());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for generation in 0..5 {
            bus.emit(CoreEvent::Cache(CacheEvent::FetchStarted { generation }))
                .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            direction: SyncDirection::Upload,
            message: "server unreachable".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let rejected = CoreEvent::Sync(SyncEvent::Rejected {
            direction: SyncDirection::Upload,
        });
        assert_eq!(rejected.severity(), EventSeverity::Warning);

        assert_eq!(resolved("mail").severity(), EventSeverity::Info);

        let stale = CoreEvent::Conflict(ConflictEvent::StaleResponseDiscarded {
            label: "mail".to_string(),
        });
        assert_eq!(stale.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(resolved("mail").description(), "Conflict resolved");
        let cleared = CoreEvent::Error(ErrorEvent::Cleared);
        assert_eq!(cleared.description(), "Error cleared");
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Cache(CacheEvent::Loaded {
            generation: 4,
            entry_count: 3,
            conflict_count: 2,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Cache\""));
        assert!(json.contains("\"event\":\"Loaded\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_sync_direction_display() {
        assert_eq!(SyncDirection::Upload.to_string(), "upload");
        assert_eq!(
            serde_json::to_string(&SyncDirection::Download).unwrap(),
            "\"download\""
        );
    }
}
