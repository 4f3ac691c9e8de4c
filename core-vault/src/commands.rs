//! Typed client over the host command boundary.
//!
//! Each method issues exactly one command and decodes its response. Failures
//! are returned as [`BridgeError`] untouched; reporting them is left to the
//! caller.

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{Command, CommandBoundary, CommandRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::models::{ConflictPair, Entry, UploadReceipt};

/// Cheap to clone; every clone shares the same boundary.
#[derive(Clone)]
pub struct LedgerClient {
    boundary: Arc<dyn CommandBoundary>,
}

impl LedgerClient {
    pub fn new(boundary: Arc<dyn CommandBoundary>) -> Self {
        Self { boundary }
    }

    async fn call(&self, request: CommandRequest) -> Result<Value> {
        let command = request.command;
        debug!(%command, "invoking command");
        let response = self.boundary.invoke(request).await;
        if let Err(err) = &response {
            debug!(%command, error = %err, "command failed");
        }
        response
    }

    async fn call_decoded<T: DeserializeOwned>(&self, request: CommandRequest) -> Result<T> {
        let command = request.command;
        let value = self.call(request).await?;
        decode(command, value)
    }

    async fn call_unit(&self, request: CommandRequest) -> Result<()> {
        self.call(request).await.map(|_| ())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Entry>> {
        self.call_decoded(CommandRequest::list()).await
    }

    #[instrument(skip(self))]
    pub async fn read_entry(&self, label: &str) -> Result<String> {
        self.call_decoded(CommandRequest::read_entry(label)).await
    }

    #[instrument(skip(self, value))]
    pub async fn add_entry(&self, label: &str, value: &str) -> Result<()> {
        self.call_unit(CommandRequest::add_entry(label, value)).await
    }

    #[instrument(skip(self))]
    pub async fn regen_pw(&self, label: &str) -> Result<()> {
        self.call_unit(CommandRequest::regen_pw(label)).await
    }

    #[instrument(skip(self))]
    pub async fn remove_entry(&self, label: &str) -> Result<()> {
        self.call_unit(CommandRequest::remove_entry(label)).await
    }

    #[instrument(skip(self))]
    pub async fn generate_pw(&self) -> Result<String> {
        self.call_decoded(CommandRequest::generate_pw()).await
    }

    #[instrument(skip(self))]
    pub async fn get_conf_pair(&self, label: &str) -> Result<ConflictPair> {
        self.call_decoded(CommandRequest::get_conf_pair(label)).await
    }

    #[instrument(skip(self))]
    pub async fn resolve_conflict(&self, label: &str, keep_original: bool) -> Result<()> {
        self.call_unit(CommandRequest::resolve_conflict(label, keep_original))
            .await
    }

    #[instrument(skip(self))]
    pub async fn export_ledger(&self) -> Result<()> {
        self.call_unit(CommandRequest::export_ledger()).await
    }

    /// Upload with `push_s` or `push`. A `null` response yields an empty receipt.
    #[instrument(skip(self, temp_password))]
    pub async fn upload(&self, command: Command, temp_password: &str) -> Result<UploadReceipt> {
        let request = match command {
            Command::Push => CommandRequest::push(temp_password),
            Command::PushS => CommandRequest::push_s(temp_password),
            other => {
                return Err(BridgeError::NotAvailable(format!(
                    "`{}` is not an upload command",
                    other
                )))
            }
        };

        match self.call(request).await? {
            Value::Null => Ok(UploadReceipt::default()),
            value => decode(command, value),
        }
    }

    /// The response payload is opaque to the client.
    #[instrument(skip(self, temp_password, pin))]
    pub async fn pull(&self, temp_password: &str, pin: &str) -> Result<Value> {
        self.call(CommandRequest::pull(temp_password, pin)).await
    }

    #[instrument(skip(self, master_password))]
    pub async fn open_collection(&self, ledger_name: &str, master_password: &str) -> Result<()> {
        self.call_unit(CommandRequest::open_collection(ledger_name, master_password))
            .await
    }
}

fn decode<T: DeserializeOwned>(command: Command, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| BridgeError::Decode {
        command: command.to_string(),
        message: err.to_string(),
    })
}
