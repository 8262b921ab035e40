//! Mailer settings from the environment or a JSON document.

use std::time::Duration;

use relaymail_smtp::{
    Credentials, DEFAULT_PORT, Mailbox, RelayConfig, TlsVerification, validate_identity,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relay and sender settings for the application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailerSettings {
    /// Relay hostname.
    pub host: String,
    /// Relay port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// AUTH LOGIN account name.
    pub username: String,
    /// AUTH LOGIN secret.
    pub password: String,
    /// Envelope sender and `From:` address.
    pub from_email: String,
    /// `From:` display name.
    #[serde(default)]
    pub from_name: String,
    /// Name announced in EHLO.
    #[serde(default = "default_helo_name")]
    pub helo_name: String,
    /// Accept any relay certificate.
    #[serde(default)]
    pub tls_insecure: bool,
    /// Connect and per-step timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL of the web client, used for reset links.
    #[serde(default)]
    pub client_url: String,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_helo_name() -> String {
    "localhost".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl MailerSettings {
    /// Loads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through a variable lookup function.
    ///
    /// Required: `SMTP_HOST`, `SMTP_EMAIL`, `SMTP_PASSWORD`, `FROM_EMAIL`.
    /// Optional: `SMTP_PORT`, `FROM_NAME`, `SMTP_HELO_NAME`,
    /// `SMTP_TLS_INSECURE`, `SMTP_TIMEOUT_SECS`, `CLIENT_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            optional(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let port = match optional("SMTP_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("SMTP_PORT is not a port: {value}")))?,
            None => default_port(),
        };
        let timeout_secs = match optional("SMTP_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                Error::Config(format!("SMTP_TIMEOUT_SECS is not a number: {value}"))
            })?,
            None => default_timeout_secs(),
        };
        let tls_insecure = match optional("SMTP_TLS_INSECURE") {
            Some(value) => parse_flag(&value)
                .ok_or_else(|| Error::Config(format!("SMTP_TLS_INSECURE is not a flag: {value}")))?,
            None => false,
        };

        Ok(Self {
            host: required("SMTP_HOST")?,
            port,
            username: required("SMTP_EMAIL")?,
            password: required("SMTP_PASSWORD")?,
            from_email: required("FROM_EMAIL")?,
            from_name: optional("FROM_NAME").unwrap_or_default(),
            helo_name: optional("SMTP_HELO_NAME").unwrap_or_else(default_helo_name),
            tls_insecure,
            timeout_secs,
            client_url: optional("CLIENT_URL").unwrap_or_default(),
        })
    }

    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid settings JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the relay configuration handed to the mailer.
    ///
    /// # Errors
    ///
    /// Returns an error if the sender address is not plausible, the EHLO name
    /// is not a single token, or the timeout is zero.
    pub fn relay_config(&self) -> Result<RelayConfig> {
        let sender = Mailbox::with_name(&self.from_name, &self.from_email)
            .map_err(|e| Error::Config(format!("FROM_EMAIL: {e}")))?;
        validate_identity(&self.helo_name)
            .map_err(|e| Error::Config(format!("SMTP_HELO_NAME: {e}")))?;
        if self.timeout_secs == 0 {
            return Err(Error::Config("SMTP_TIMEOUT_SECS must be positive".into()));
        }

        let tls = if self.tls_insecure {
            TlsVerification::Relaxed
        } else {
            TlsVerification::Strict
        };
        let timeout = Duration::from_secs(self.timeout_secs);

        Ok(RelayConfig::builder(
            &self.host,
            Credentials::new(&self.username, &self.password),
            sender,
        )
        .port(self.port)
        .local_identity(&self.helo_name)
        .tls(tls)
        .connect_timeout(timeout)
        .io_timeout(timeout)
        .build())
    }
}

impl std::fmt::Debug for MailerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("helo_name", &self.helo_name)
            .field("tls_insecure", &self.tls_insecure)
            .field("timeout_secs", &self.timeout_secs)
            .field("client_url", &self.client_url)
            .finish()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
