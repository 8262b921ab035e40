//! Error types for SMTP delivery.

use std::io;
use std::time::Duration;

use crate::session::SessionState;
use crate::types::ReplyCode;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failed delivery.
///
/// Callers without protocol knowledge branch on this instead of matching
/// individual [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Relay unreachable, connection refused, or transport broke mid-session.
    Connection,
    /// Unexpected or malformed reply.
    Protocol,
    /// STARTTLS handshake failed.
    Tls,
    /// Relay rejected the credentials.
    Auth,
    /// Relay refused the recipient mailbox.
    RecipientRejected,
    /// No reply within the step deadline.
    Timeout,
    /// The message or an address was rejected before connecting.
    InvalidInput,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Protocol => "protocol",
            Self::Tls => "tls",
            Self::Auth => "auth",
            Self::RecipientRejected => "recipient_rejected",
            Self::Timeout => "timeout",
            Self::InvalidInput => "invalid_input",
        };
        f.write_str(name)
    }
}

/// SMTP delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the relay connection.
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// The relay closed the connection while a reply was expected.
    #[error("Connection closed by relay during {0}")]
    ConnectionClosed(SessionState),

    /// TLS handshake or configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The relay answered with a code other than the one the step expects.
    #[error("Unexpected reply during {state}: expected {expected}, got {code} {message}")]
    UnexpectedReply {
        /// Step that was executing.
        state: SessionState,
        /// Code the step required.
        expected: ReplyCode,
        /// Code the relay sent.
        code: ReplyCode,
        /// Reply text.
        message: String,
    },

    /// Reply could not be parsed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Credentials were rejected.
    #[error("Authentication failed: {code} {message}")]
    AuthRejected {
        /// Reply code (usually 535).
        code: ReplyCode,
        /// Reply text.
        message: String,
    },

    /// Recipient mailbox was refused.
    #[error("Recipient {recipient} rejected: {code} {message}")]
    RecipientRejected {
        /// The refused address.
        recipient: String,
        /// Reply code (e.g. 550).
        code: ReplyCode,
        /// Reply text.
        message: String,
    },

    /// Step deadline expired.
    #[error("Timed out after {after:?} during {state}")]
    Timeout {
        /// Step that was executing.
        state: SessionState,
        /// Configured deadline.
        after: Duration,
    },

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message failed validation.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Relay configuration failed validation.
    #[error("Invalid relay configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::ConnectionClosed(_) => ErrorKind::Connection,
            Self::Tls(_) => ErrorKind::Tls,
            Self::UnexpectedReply { .. } | Self::Protocol(_) => ErrorKind::Protocol,
            Self::AuthRejected { .. } => ErrorKind::Auth,
            Self::RecipientRejected { .. } => ErrorKind::RecipientRejected,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidAddress(_) | Self::InvalidMessage(_) | Self::InvalidConfig(_) => {
                ErrorKind::InvalidInput
            }
        }
    }

    /// Returns the relay's reply code, if the failure carries one.
    #[must_use]
    pub const fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Self::UnexpectedReply { code, .. }
            | Self::AuthRejected { code, .. }
            | Self::RecipientRejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code.is_permanent())
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code.is_transient())
    }
}
