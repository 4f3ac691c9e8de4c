//! Core service façade for host applications.
//!
//! A [`VaultService`] is one open ledger session. Opening it sends the master
//! password to the host; on success it owns every component of the session
//! (the error channel, entry cache, conflict registry, entry operations,
//! conflict resolution flow and sync coordinator), all sharing one event bus.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::VaultService;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .command_boundary(Arc::new(MyBoundary))
//!     .build()?;
//! let session = VaultService::open(config, "master password").await?;
//!
//! session.cache()?.load();
//! for label in session.registry()?.conflicted_labels() {
//!     println!("needs attention: {}", label);
//! }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use chrono::{DateTime, Utc};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_sync::{ConflictResolutionFlow, SyncCoordinator};
use core_vault::{
    ConflictRegistry, EntryService, ErrorChannel, LedgerClient, MetadataCache, VaultError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

struct Session {
    id: Uuid,
    ledger_name: String,
    opened_at: DateTime<Utc>,
    closed: AtomicBool,
    events: EventBus,
    errors: ErrorChannel,
    cache: MetadataCache,
    registry: ConflictRegistry,
    entries: EntryService,
    resolution: ConflictResolutionFlow,
    sync: SyncCoordinator,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct VaultService {
    session: Arc<Session>,
}

impl VaultService {
    /// Open the configured ledger with `master_password`.
    ///
    /// Events are published on a fresh bus sized by
    /// [`CoreConfig::event_buffer_size`]. Use [`open_with_events`](Self::open_with_events)
    /// to observe the `Opened` event itself.
    pub async fn open(config: CoreConfig, master_password: &str) -> Result<Self> {
        let events = EventBus::new(config.event_buffer_size);
        Self::open_with_events(config, master_password, events).await
    }

    /// Open the configured ledger, publishing on an existing event bus.
    #[instrument(skip(config, master_password, events), fields(ledger = %config.ledger_name))]
    pub async fn open_with_events(
        config: CoreConfig,
        master_password: &str,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;
        if master_password.is_empty() {
            let err = VaultError::invalid_input("master_password", "must not be empty");
            return Err(err.into());
        }

        let client = LedgerClient::new(config.command_boundary.clone());
        if let Err(err) = client
            .open_collection(&config.ledger_name, master_password)
            .await
        {
            warn!(error = %err, "host refused to open the ledger");
            return Err(err.into());
        }

        let errors = ErrorChannel::new(events.clone());
        let cache = MetadataCache::new(client.clone(), errors.clone(), events.clone());
        let session = Session {
            id: Uuid::new_v4(),
            ledger_name: config.ledger_name,
            opened_at: Utc::now(),
            closed: AtomicBool::new(false),
            registry: ConflictRegistry::new(cache.clone()),
            entries: EntryService::new(
                client.clone(),
                cache.clone(),
                errors.clone(),
                config.clipboard,
            ),
            resolution: ConflictResolutionFlow::new(
                client.clone(),
                cache.clone(),
                errors.clone(),
                events.clone(),
            ),
            sync: SyncCoordinator::new(
                client,
                cache.clone(),
                errors.clone(),
                events.clone(),
                config.upload_command,
            ),
            cache,
            errors,
            events,
        };

        info!(session_id = %session.id, "ledger session opened");
        session
            .events
            .emit(CoreEvent::Session(SessionEvent::Opened {
                session_id: session.id.to_string(),
                ledger_name: session.ledger_name.clone(),
            }))
            .ok();

        Ok(Self {
            session: Arc::new(session),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    pub fn ledger_name(&self) -> &str {
        &self.session.ledger_name
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.session.opened_at
    }

    pub fn events(&self) -> &EventBus {
        &self.session.events
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.session.errors
    }

    /// The entry cache.
    ///
    /// This and the other component accessors return
    /// [`CoreError::SessionClosed`] once [`close`](Self::close) was called.
    pub fn cache(&self) -> Result<&MetadataCache> {
        self.ensure_open()?;
        Ok(&self.session.cache)
    }

    pub fn registry(&self) -> Result<&ConflictRegistry> {
        self.ensure_open()?;
        Ok(&self.session.registry)
    }

    pub fn entries(&self) -> Result<&EntryService> {
        self.ensure_open()?;
        Ok(&self.session.entries)
    }

    pub fn resolution(&self) -> Result<&ConflictResolutionFlow> {
        self.ensure_open()?;
        Ok(&self.session.resolution)
    }

    pub fn sync(&self) -> Result<&SyncCoordinator> {
        self.ensure_open()?;
        Ok(&self.session.sync)
    }

    pub fn is_closed(&self) -> bool {
        self.session.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(CoreError::SessionClosed {
                session_id: self.session.id.to_string(),
            });
        }
        Ok(())
    }

    /// End the session. Components are no longer handed out afterwards;
    /// closing twice is an error.
    pub fn close(&self) -> Result<()> {
        let session_id = self.session.id.to_string();
        if self.session.closed.swap(true, Ordering::AcqRel) {
            return Err(CoreError::SessionClosed { session_id });
        }

        info!(session_id = %session_id, "ledger session closed");
        self.session
            .events
            .emit(CoreEvent::Session(SessionEvent::Closed { session_id }))
            .ok();
        Ok(())
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService")
            .field("session_id", &self.session.id)
            .field("ledger_name", &self.session.ledger_name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::testing::ScriptedBoundary;
    use bridge_traits::{args, Command};
    use serde_json::Value;

    fn config(boundary: Arc<ScriptedBoundary>) -> CoreConfig {
        CoreConfig::builder()
            .command_boundary(boundary)
            .ledger_name("Work")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_sends_master_password() {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary.respond(Command::OpenCollection, Value::Null);

        let service = VaultService::open(config(boundary.clone()), "master")
            .await
            .unwrap();

        let call = boundary.last_call(Command::OpenCollection).unwrap();
        assert_eq!(call.arg_str(args::LEDGER_NAME), Some("Work"));
        assert_eq!(call.arg_str(args::MASTER_PASSWORD), Some("master"));
        assert_eq!(service.ledger_name(), "Work");
        assert!(!service.is_closed());
    }

    #[tokio::test]
    async fn test_empty_master_password_is_rejected_without_a_call() {
        let boundary = Arc::new(ScriptedBoundary::new());

        let err = VaultService::open(config(boundary.clone()), "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Vault(VaultError::InvalidInput { .. })
        ));
        assert!(boundary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refused_open_keeps_host_message() {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary.fail(
            Command::OpenCollection,
            BridgeError::from("Wrong master password"),
        );

        let err = VaultService::open(config(boundary), "nope")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Wrong master password");
    }

    #[tokio::test]
    async fn test_close_twice() {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary.respond(Command::OpenCollection, Value::Null);
        let service = VaultService::open(config(boundary), "master")
            .await
            .unwrap();

        service.close().unwrap();
        assert!(service.is_closed());
        assert!(matches!(
            service.close(),
            Err(CoreError::SessionClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_components_are_refused_after_close() {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary.respond(Command::OpenCollection, Value::Null);
        let service = VaultService::open(config(boundary), "master")
            .await
            .unwrap();
        assert!(service.cache().is_ok());

        service.close().unwrap();

        assert!(matches!(
            service.cache(),
            Err(CoreError::SessionClosed { .. })
        ));
        assert!(service.registry().is_err());
        assert!(service.entries().is_err());
        assert!(service.resolution().is_err());
        assert!(service.sync().is_err());
        assert!(service.errors().latest().is_none());
    }
}
