//! # Core Configuration Module
//!
//! Provides configuration management for the password ledger client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and settings for a session. It enforces
//! fail-fast validation so that a missing bridge is reported before the first
//! command is ever issued.
//!
//! ## Required Dependencies
//!
//! - `CommandBoundary` - Request/response channel to the host-owned ledger
//!
//! ## Optional Dependencies
//!
//! - `Clipboard` - Needed only for copying secrets
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, UploadCommand};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .command_boundary(Arc::new(MyBoundary))
//!     .clipboard(Arc::new(MyClipboard))
//!     .ledger_name("Work passwords")
//!     .upload_command(UploadCommand::PushFiles)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: no CommandBoundary was provided
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing command boundary");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clipboard, Command, CommandBoundary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the ledger opened when the host does not choose one.
pub const DEFAULT_LEDGER_NAME: &str = "First password ledger";

/// Which host command performs an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadCommand {
    /// `push_s`: uploads a snapshot and answers with the pairing PIN.
    #[default]
    PushSnapshot,
    /// `push`: legacy file upload; the response may omit the PIN.
    PushFiles,
}

impl UploadCommand {
    pub fn command(&self) -> Command {
        match self {
            UploadCommand::PushSnapshot => Command::PushS,
            UploadCommand::PushFiles => Command::Push,
        }
    }
}

/// Core configuration for a ledger session.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Request/response channel to the host (required)
    pub command_boundary: Arc<dyn CommandBoundary>,

    /// System clipboard (optional)
    pub clipboard: Option<Arc<dyn Clipboard>>,

    /// Ledger opened by `open_collection`
    pub ledger_name: String,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Command used for uploads
    pub upload_command: UploadCommand,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("command_boundary", &"CommandBoundary { ... }")
            .field(
                "clipboard",
                &self.clipboard.as_ref().map(|_| "Clipboard { ... }"),
            )
            .field("ledger_name", &self.ledger_name)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("upload_command", &self.upload_command)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Ledger name is not blank
    /// - Event buffer size is > 0 and <= 65,536
    pub fn validate(&self) -> Result<()> {
        if self.ledger_name.trim().is_empty() {
            return Err(Error::Config("Ledger name cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 65_536 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 65,536".to_string(),
            ));
        }

        Ok(())
    }
}

fn command_boundary_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "CommandBoundary".to_string(),
        message: "CommandBoundary implementation is required to reach the ledger. \
                 Desktop: forward commands over the application's IPC bridge. \
                 Tests: use bridge_traits::testing::ScriptedBoundary."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    command_boundary: Option<Arc<dyn CommandBoundary>>,
    clipboard: Option<Arc<dyn Clipboard>>,
    ledger_name: Option<String>,
    event_buffer_size: Option<usize>,
    upload_command: UploadCommand,
}

impl CoreConfigBuilder {
    /// Sets the command boundary (required).
    pub fn command_boundary(mut self, boundary: Arc<dyn CommandBoundary>) -> Self {
        self.command_boundary = Some(boundary);
        self
    }

    pub fn clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    /// Sets the ledger name. Defaults to [`DEFAULT_LEDGER_NAME`].
    pub fn ledger_name(mut self, name: impl Into<String>) -> Self {
        self.ledger_name = Some(name.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn upload_command(mut self, command: UploadCommand) -> Self {
        self.upload_command = command;
        self
    }

    /// Builds the final configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if no command boundary was provided
    /// - [`Error::Config`] if a setting fails validation
    pub fn build(self) -> Result<CoreConfig> {
        let command_boundary = self
            .command_boundary
            .ok_or_else(command_boundary_missing_error)?;

        let config = CoreConfig {
            command_boundary,
            clipboard: self.clipboard,
            ledger_name: self
                .ledger_name
                .unwrap_or_else(|| DEFAULT_LEDGER_NAME.to_string()),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            upload_command: self.upload_command,
        };

        config.validate()?;

        Ok(config)
    }
}
