//! State types for conflict resolution and the sync gate.
//!
//! Transitions are validated here; the flow and the coordinator only decide
//! when to apply them.

use core_runtime::events::SyncDirection;
use core_vault::ConflictPair;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SyncError};

// ============================================================================
// Resolution
// ============================================================================

/// Which copy of a conflicted entry to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The value stored on this device
    Local,
    /// The value received from the other device
    Remote,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Local => "local",
            Side::Remote => "remote",
        }
    }

    /// Wire value of `keepOriginal`.
    pub fn keep_original(&self) -> bool {
        matches!(self, Side::Local)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selected candidate.
#[derive(Clone, PartialEq, Eq)]
pub struct Choice {
    pub side: Side,
    pub value: String,
}

impl Choice {
    pub fn from_pair(pair: &ConflictPair, side: Side) -> Self {
        let value = match side {
            Side::Local => pair.local_value.clone(),
            Side::Remote => pair.remote_value.clone(),
        };
        Self { side, value }
    }

    pub fn keep_original(&self) -> bool {
        self.side.keep_original()
    }
}

impl fmt::Debug for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choice")
            .field("side", &self.side)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Where the single resolution slot currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolutionState {
    #[default]
    Idle,
    /// A label is shown; its candidates may still be in flight.
    Revealed {
        label: String,
        pair: Option<ConflictPair>,
    },
    Selecting {
        label: String,
        pair: ConflictPair,
        choice: Choice,
    },
    /// The choice was sent to the host.
    Resolving {
        label: String,
        pair: ConflictPair,
        choice: Choice,
    },
}

impl ResolutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Idle => "idle",
            ResolutionState::Revealed { .. } => "revealed",
            ResolutionState::Selecting { .. } => "selecting",
            ResolutionState::Resolving { .. } => "resolving",
        }
    }

    /// The label in the slot, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Revealed { label, .. }
            | ResolutionState::Selecting { label, .. }
            | ResolutionState::Resolving { label, .. } => Some(label),
        }
    }

    /// The candidates, once they have arrived.
    pub fn pair(&self) -> Option<&ConflictPair> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Revealed { pair, .. } => pair.as_ref(),
            ResolutionState::Selecting { pair, .. } | ResolutionState::Resolving { pair, .. } => {
                Some(pair)
            }
        }
    }

    pub fn choice(&self) -> Option<&Choice> {
        match self {
            ResolutionState::Selecting { choice, .. }
            | ResolutionState::Resolving { choice, .. } => Some(choice),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ResolutionState::Idle)
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self, ResolutionState::Resolving { .. })
    }

    /// Apply a choice. Allowed once the candidates are known and no commit
    /// is in flight; re-selecting replaces the previous choice.
    pub fn select(&self, side: Side) -> Result<Self> {
        match self {
            ResolutionState::Revealed {
                label,
                pair: Some(pair),
            }
            | ResolutionState::Selecting { label, pair, .. } => Ok(ResolutionState::Selecting {
                label: label.clone(),
                pair: pair.clone(),
                choice: Choice::from_pair(pair, side),
            }),
            ResolutionState::Revealed { label, pair: None } => Err(SyncError::PairPending {
                label: label.clone(),
            }),
            ResolutionState::Idle => Err(SyncError::NothingRevealed),
            ResolutionState::Resolving { .. } => Err(self.transition_error(
                "selecting",
                "A resolution is already being committed",
            )),
        }
    }

    /// Move a selection into `Resolving`. `None` when nothing is selected.
    pub fn begin_resolve(&self) -> Option<Self> {
        match self {
            ResolutionState::Selecting {
                label,
                pair,
                choice,
            } => Some(ResolutionState::Resolving {
                label: label.clone(),
                pair: pair.clone(),
                choice: choice.clone(),
            }),
            _ => None,
        }
    }

    /// State after a rejected commit: the candidates are shown again.
    pub fn after_failed_resolve(&self) -> Result<Self> {
        match self {
            ResolutionState::Resolving { label, pair, .. } => Ok(ResolutionState::Revealed {
                label: label.clone(),
                pair: Some(pair.clone()),
            }),
            _ => Err(self.transition_error("revealed", "No resolution is being committed")),
        }
    }

    fn transition_error(&self, to: &str, reason: &str) -> SyncError {
        SyncError::InvalidStateTransition {
            from: self.as_str().to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Sync gate
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "direction", rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    InProgress(SyncDirection),
}

impl SyncState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }

    pub fn direction(&self) -> Option<SyncDirection> {
        match self {
            SyncState::Idle => None,
            SyncState::InProgress(direction) => Some(*direction),
        }
    }
}
