//! # Sync Coordinator
//!
//! Gates device-to-device transfers of the ledger.
//!
//! ## Overview
//!
//! Only one transfer runs at a time. An upload or download requested while
//! another is in progress is rejected without contacting the host. The gate
//! reopens when the transfer finishes, whether it succeeded or failed.
//!
//! ## Workflow
//!
//! ### Upload
//! 1. Validate the temporary password
//! 2. Enter the gate
//! 3. Send `push_s` (or `push`, see [`UploadCommand`]) and return the PIN
//!
//! ### Download
//! 1. Validate the temporary password and PIN
//! 2. Enter the gate
//! 3. Send `pull`
//! 4. Reload the entry cache, which may now contain conflicts
//!
//! ## Usage
//!
//! ```rust,ignore
//! let receipt = coordinator.upload("correct horse").await?;
//! println!("PIN for the other device: {:?}", receipt.pin);
//!
//! // On the other device
//! coordinator.download("correct horse", "4821").await?;
//! ```

use core_runtime::config::UploadCommand;
use core_runtime::events::{CoreEvent, EventBus, SyncDirection, SyncEvent};
use core_vault::{ErrorChannel, LedgerClient, MetadataCache, UploadReceipt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::state::SyncState;

struct Inner {
    client: LedgerClient,
    cache: MetadataCache,
    errors: ErrorChannel,
    events: EventBus,
    upload_command: UploadCommand,
    state: watch::Sender<SyncState>,
}

impl Inner {
    fn emit(&self, event: SyncEvent) {
        self.events.emit(CoreEvent::Sync(event)).ok();
    }

    /// Move the gate to `InProgress` unless a transfer is already running.
    fn enter(&self, direction: SyncDirection) -> Result<SyncGuard<'_>> {
        let mut running = None;
        self.state.send_if_modified(|state| match state {
            SyncState::Idle => {
                *state = SyncState::InProgress(direction);
                true
            }
            SyncState::InProgress(current) => {
                running = Some(*current);
                false
            }
        });

        match running {
            Some(current) => {
                warn!(requested = %direction, running = %current, "sync already in progress");
                self.emit(SyncEvent::Rejected { direction });
                Err(SyncError::SyncInProgress { direction: current })
            }
            None => {
                self.emit(SyncEvent::Started { direction });
                Ok(SyncGuard { state: &self.state })
            }
        }
    }

    fn fail(&self, direction: SyncDirection, err: bridge_traits::BridgeError) -> SyncError {
        let message = err.message();
        self.errors.report(message.clone());
        self.emit(SyncEvent::Failed { direction, message });
        err.into()
    }
}

/// Reopens the gate when dropped.
struct SyncGuard<'a> {
    state: &'a watch::Sender<SyncState>,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(SyncState::Idle);
    }
}

#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(
        client: LedgerClient,
        cache: MetadataCache,
        errors: ErrorChannel,
        events: EventBus,
        upload_command: UploadCommand,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            inner: Arc::new(Inner {
                client,
                cache,
                errors,
                events,
                upload_command,
                state,
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Upload the ledger, protected by `temp_password`.
    #[instrument(skip(self, temp_password))]
    pub async fn upload(&self, temp_password: &str) -> Result<UploadReceipt> {
        require("temp_password", temp_password)?;
        let direction = SyncDirection::Upload;
        let _guard = self.inner.enter(direction)?;

        let command = self.inner.upload_command.command();
        match self.inner.client.upload(command, temp_password).await {
            Ok(receipt) => {
                info!(%command, has_pin = receipt.pin.is_some(), "upload completed");
                self.inner.emit(SyncEvent::Completed { direction });
                Ok(receipt)
            }
            Err(err) => Err(self.inner.fail(direction, err)),
        }
    }

    /// Download and merge the ledger uploaded under `pin`.
    ///
    /// On success the entry cache is reloaded before returning.
    #[instrument(skip(self, temp_password, pin))]
    pub async fn download(&self, temp_password: &str, pin: &str) -> Result<()> {
        require("temp_password", temp_password)?;
        require("pin", pin)?;
        let direction = SyncDirection::Download;

        {
            let _guard = self.inner.enter(direction)?;
            if let Err(err) = self.inner.client.pull(temp_password, pin).await {
                return Err(self.inner.fail(direction, err));
            }
            info!("download completed");
            self.inner.emit(SyncEvent::Completed { direction });
        }

        self.inner.cache.reload().await;
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SyncError::invalid_input(field, "must not be empty"));
    }
    Ok(())
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("state", &self.state())
            .field("upload_command", &self.inner.upload_command)
            .finish()
    }
}
