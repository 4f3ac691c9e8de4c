use serde_json::Value;
use thiserror::Error;

/// Prefix used when a boundary failure carries something other than a string.
pub const UNKNOWN_ERROR_PREFIX: &str = "An unknown error occurred";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The host rejected the command with a plain message. Displayed as-is.
    #[error("{0}")]
    Rejected(String),

    /// The host failed with a structured (non-string) payload.
    #[error("An unknown error occurred: {}", render_payload(.0))]
    Unknown(Value),

    /// A response did not have the shape the command promises.
    #[error("An unknown error occurred: malformed `{command}` response: {message}")]
    Decode { command: String, message: String },

    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),
}

impl BridgeError {
    /// Normalize an arbitrary failure payload returned by the host.
    ///
    /// String payloads become [`BridgeError::Rejected`] and are surfaced
    /// verbatim; anything else is kept as [`BridgeError::Unknown`].
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::String(message) => BridgeError::Rejected(message),
            other => BridgeError::Unknown(other),
        }
    }

    /// The user-facing message for this failure.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<String> for BridgeError {
    fn from(message: String) -> Self {
        BridgeError::Rejected(message)
    }
}

impl From<&str> for BridgeError {
    fn from(message: &str) -> Self {
        BridgeError::Rejected(message.to_string())
    }
}

fn render_payload(payload: &Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}

pub type Result<T> = std::result::Result<T, BridgeError>;
