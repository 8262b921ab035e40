//! Error types for the core library.

use relaymail_smtp::ErrorKind;
use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Delivery failed or the message was invalid.
    #[error("SMTP error: {0}")]
    Smtp(#[from] relaymail_smtp::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the delivery failure kind, if this is a delivery error.
    #[must_use]
    pub const fn delivery_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Smtp(e) => Some(e.kind()),
            Self::Serde(_) | Self::Config(_) => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
