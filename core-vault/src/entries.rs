//! Everyday entry operations: read, copy, create, regenerate, remove,
//! generate and export.
//!
//! Every boundary failure is written to the [`ErrorChannel`] and also
//! returned. Local validation failures (empty labels, conflicted entries,
//! no clipboard) are only returned. Successful mutations reload the cache
//! before returning.

use bridge_traits::Clipboard;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::cache::MetadataCache;
use crate::commands::LedgerClient;
use crate::error::{Result, VaultError};
use crate::error_channel::ErrorChannel;
use crate::registry::ConflictRegistry;

#[derive(Clone)]
pub struct EntryService {
    client: LedgerClient,
    cache: MetadataCache,
    registry: ConflictRegistry,
    errors: ErrorChannel,
    clipboard: Option<Arc<dyn Clipboard>>,
}

impl EntryService {
    pub fn new(
        client: LedgerClient,
        cache: MetadataCache,
        errors: ErrorChannel,
        clipboard: Option<Arc<dyn Clipboard>>,
    ) -> Self {
        Self {
            client,
            registry: ConflictRegistry::new(cache.clone()),
            cache,
            errors,
            clipboard,
        }
    }

    /// Fetch the secret of a non-conflicted entry.
    ///
    /// A conflicted entry is refused without reading it from the host; its
    /// value only becomes readable through conflict resolution. Before the
    /// first load, or while a refresh is in flight, the read waits for the
    /// entry list to settle.
    #[instrument(skip(self))]
    pub async fn read_secret(&self, label: &str) -> Result<String> {
        require_label(label)?;
        if self.registry.is_conflicted_when_loaded(label).await {
            return Err(VaultError::Conflicted {
                label: label.to_string(),
            });
        }
        let secret = self.client.read_entry(label).await;
        self.track(secret)
    }

    /// Read the secret and place it on the system clipboard.
    #[instrument(skip(self))]
    pub async fn copy_secret(&self, label: &str) -> Result<()> {
        let clipboard = self
            .clipboard
            .as_ref()
            .ok_or(VaultError::ClipboardUnavailable)?;
        let secret = self.read_secret(label).await?;
        let written = clipboard.write_text(&secret).await;
        self.track(written)
    }

    /// Add an entry. When `secret` is absent or empty a password is
    /// generated by the host first.
    #[instrument(skip(self, secret))]
    pub async fn create_entry(&self, label: &str, secret: Option<&str>) -> Result<()> {
        require_label(label)?;

        let secret = match secret.filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => self.generate_password().await?,
        };

        let added = self.client.add_entry(label, &secret).await;
        self.track(added)?;
        info!(label, "entry created");
        self.cache.reload().await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn regenerate(&self, label: &str) -> Result<()> {
        require_label(label)?;
        let regenerated = self.client.regen_pw(label).await;
        self.track(regenerated)?;
        self.cache.reload().await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_entry(&self, label: &str) -> Result<()> {
        require_label(label)?;
        let removed = self.client.remove_entry(label).await;
        self.track(removed)?;
        info!(label, "entry removed");
        self.cache.reload().await;
        Ok(())
    }

    pub async fn generate_password(&self) -> Result<String> {
        let generated = self.client.generate_pw().await;
        self.track(generated)
    }

    #[instrument(skip(self))]
    pub async fn export_ledger(&self) -> Result<()> {
        let exported = self.client.export_ledger().await;
        self.track(exported)
    }

    fn track<T>(&self, result: bridge_traits::error::Result<T>) -> Result<T> {
        result.map_err(|err| {
            self.errors.report(err.message());
            VaultError::from(err)
        })
    }
}

fn require_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(VaultError::invalid_input("label", "must not be empty"));
    }
    Ok(())
}
