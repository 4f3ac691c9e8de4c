//! # Host Bridge Traits
//!
//! Contracts between the ledger client core and the host application.
//!
//! ## Overview
//!
//! The host owns everything the core deliberately does not: encryption,
//! persistent storage, the sync server protocol, the clipboard and the user
//! interface. The core reaches those capabilities only through the traits in
//! this crate.
//!
//! ## Traits
//!
//! - [`CommandBoundary`](command::CommandBoundary) - Named request/response commands
//!   (`list`, `get_conf_pair`, `resolve_conflict`, `push_s`, `pull`, ...)
//! - [`Clipboard`](clipboard::Clipboard) - Copy a retrieved secret to the system clipboard
//! - [`LoggerSink`](log_sink::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). A host failure
//! that is a plain string is kept verbatim ([`BridgeError::Rejected`]); any
//! other payload is wrapped as `"An unknown error occurred: <payload>"`
//! ([`BridgeError::Unknown`]).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.
//!
//! ## Testing
//!
//! Enable the `test-utils` feature to get
//! [`ScriptedBoundary`](testing::ScriptedBoundary), an in-memory boundary whose
//! responses and call ordering are controlled by the test.

pub mod clipboard;
pub mod command;
pub mod error;
pub mod log_sink;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::BridgeError;

// Re-export commonly used types
pub use clipboard::Clipboard;
pub use command::{args, Command, CommandBoundary, CommandRequest};
pub use log_sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
