use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A global subscriber was already installed, or the layers failed to build.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
