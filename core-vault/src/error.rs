use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    /// The host failed the command. Displayed exactly as the host reported it.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Entry `{label}` has an unresolved conflict")]
    Conflicted { label: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Clipboard not available")]
    ClipboardUnavailable,
}

impl VaultError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        VaultError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error came back from the host rather than from local validation.
    pub fn is_bridge(&self) -> bool {
        matches!(self, VaultError::Bridge(_))
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
