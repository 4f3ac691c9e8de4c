//! # Conflict Resolution & Sync Module
//!
//! Client-side state machines that drive the host's reconciliation and
//! transfer commands.
//!
//! ## Components
//!
//! - **State Types** (`state`): Resolution slot and sync gate states with validated transitions
//! - **Conflict Resolution Flow** (`resolution`): Reveal, select and commit one conflicted entry at a time
//! - **Sync Coordinator** (`coordinator`): Mutually exclusive upload/download round trips

pub mod coordinator;
pub mod error;
pub mod resolution;
pub mod state;

pub use coordinator::SyncCoordinator;
pub use error::{Result, SyncError};
pub use resolution::{ConflictResolutionFlow, ResolveOutcome};
pub use state::{Choice, ResolutionState, Side, SyncState};

pub use core_runtime::events::SyncDirection;
