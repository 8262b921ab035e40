//! Relay configuration types.

use std::time::Duration;

use base64::Engine;

use crate::connection::TlsVerification;
use crate::error::{Error, Result};
use crate::types::Mailbox;

/// Default submission port (STARTTLS).
pub const DEFAULT_PORT: u16 = 587;

/// AUTH LOGIN credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    account_name: String,
    secret: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(account_name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            secret: secret.into(),
        }
    }

    /// Returns the account name.
    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Base64 of the account name, as sent after the first 334.
    #[must_use]
    pub fn encoded_account_name(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.account_name.as_bytes())
    }

    /// Base64 of the secret, as sent after the second 334.
    #[must_use]
    pub fn encoded_secret(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.secret.as_bytes())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_name", &self.account_name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Relay connection configuration.
///
/// Shared read-only between concurrent sends.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay hostname (also used for SNI and certificate matching).
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// AUTH LOGIN credentials.
    pub credentials: Credentials,
    /// Envelope sender and `From:` header.
    pub sender: Mailbox,
    /// Name announced in EHLO.
    pub local_identity: String,
    /// Certificate validation policy.
    pub tls: TlsVerification,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Deadline for each command/reply exchange.
    pub io_timeout: Duration,
}

/// Checks that a name is usable as the EHLO argument.
///
/// The name goes on the command line verbatim, so whitespace and control
/// characters would split it into a second command.
///
/// # Errors
///
/// Returns an error if the name is empty or contains whitespace or control
/// characters.
pub fn validate_identity(identity: &str) -> Result<()> {
    if identity.is_empty() {
        return Err(Error::InvalidConfig("EHLO identity cannot be empty".into()));
    }
    if identity.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidConfig(format!(
            "EHLO identity contains forbidden characters: {identity:?}"
        )));
    }
    Ok(())
}

impl RelayConfig {
    /// Checks the fields that end up on a command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO identity is not a single token.
    pub fn validate(&self) -> Result<()> {
        validate_identity(&self.local_identity)
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(
        host: impl Into<String>,
        credentials: Credentials,
        sender: Mailbox,
    ) -> RelayConfigBuilder {
        RelayConfigBuilder::new(host, credentials, sender)
    }
}

/// Builder for relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfigBuilder {
    host: String,
    port: u16,
    credentials: Credentials,
    sender: Mailbox,
    local_identity: String,
    tls: TlsVerification,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl RelayConfigBuilder {
    /// Creates a new builder for the given relay.
    #[must_use]
    pub fn new(host: impl Into<String>, credentials: Credentials, sender: Mailbox) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            credentials,
            sender,
            local_identity: "localhost".to_string(),
            tls: TlsVerification::Strict,
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the name announced in EHLO.
    #[must_use]
    pub fn local_identity(mut self, identity: impl Into<String>) -> Self {
        self.local_identity = identity.into();
        self
    }

    /// Sets the certificate validation policy.
    #[must_use]
    pub const fn tls(mut self, verification: TlsVerification) -> Self {
        self.tls = verification;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-step I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RelayConfig {
        RelayConfig {
            host: self.host,
            port: self.port,
            credentials: self.credentials,
            sender: self.sender,
            local_identity: self.local_identity,
            tls: self.tls,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}
