//! # Ledger Vault
//!
//! Client-side view of the host-owned password ledger.
//!
//! ## Overview
//!
//! - [`LedgerClient`] - typed wrapper over the command boundary
//! - [`ErrorChannel`] - latest user-facing failure message
//! - [`MetadataCache`] - lazily loaded entry list with superseding refreshes
//! - [`ConflictRegistry`] - conflicted labels derived from the cache
//! - [`EntryService`] - read/copy/create/regenerate/remove/generate/export
//!
//! All components are cheap to clone and share their state between clones.

pub mod cache;
pub mod commands;
pub mod entries;
pub mod error;
pub mod error_channel;
pub mod models;
pub mod registry;

pub use cache::MetadataCache;
pub use commands::LedgerClient;
pub use entries::EntryService;
pub use error::{Result, VaultError};
pub use error_channel::ErrorChannel;
pub use models::{CacheState, ConflictPair, Entry, UploadReceipt};
pub use registry::ConflictRegistry;
