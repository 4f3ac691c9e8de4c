use thiserror::Error;

/// Errors surfaced to the host application.
///
/// Ledger and sync failures are transparent so that host messages reach the
/// user unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error(transparent)]
    Vault(#[from] core_vault::VaultError),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),

    #[error("Session {session_id} is closed")]
    SessionClosed { session_id: String },
}

impl From<bridge_traits::BridgeError> for CoreError {
    fn from(err: bridge_traits::BridgeError) -> Self {
        CoreError::Vault(err.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
