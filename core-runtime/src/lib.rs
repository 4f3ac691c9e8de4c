//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the ledger client core:
//! - Logging and tracing infrastructure
//! - Session configuration
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the vault, sync and service
//! crates depend on. It establishes the logging conventions, the fail-fast
//! configuration builder and the event broadcasting mechanism used
//! throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
