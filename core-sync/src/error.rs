use bridge_traits::error::BridgeError;
use core_runtime::events::SyncDirection;
use core_vault::VaultError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Failure reported by the ledger layer; host messages are displayed as-is.
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Sync already in progress ({direction})")]
    SyncInProgress { direction: SyncDirection },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("No conflict is revealed")]
    NothingRevealed,

    #[error("Candidates for `{label}` have not arrived yet")]
    PairPending { label: String },

    #[error("Selected value matches neither candidate of `{label}`")]
    InvalidSelection { label: String },

    #[error("Both candidates of `{label}` are identical; choose a side instead")]
    AmbiguousSelection { label: String },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

impl SyncError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<BridgeError> for SyncError {
    fn from(err: BridgeError) -> Self {
        SyncError::Vault(VaultError::Bridge(err))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
