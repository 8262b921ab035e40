//! # relaymail-smtp
//!
//! A small SMTP submission client for transactional email.
//!
//! Each [`Mailer::send`] opens one connection to the relay, upgrades it with
//! STARTTLS, authenticates with AUTH LOGIN, submits a single-part message and
//! closes the connection again, whatever the outcome.
//!
//! ## Features
//!
//! - **Explicit step table**: every command waits for exactly one reply code,
//!   no pipelining ([`session`])
//! - **STARTTLS**: in-band upgrade with rustls, strict certificate validation
//!   by default ([`TlsVerification`])
//! - **Typed failures**: connection, protocol, TLS, authentication, recipient
//!   rejection and timeout are distinct ([`ErrorKind`])
//! - **Pluggable transport**: a [`Connector`] supplies the plain and secure
//!   streams, so the exchange can run against an in-memory relay
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_smtp::{Credentials, Mailbox, Mailer, OutboundMessage, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> relaymail_smtp::Result<()> {
//!     let config = RelayConfig::builder(
//!         "smtp.example.com",
//!         Credentials::new("apikey", "secret"),
//!         Mailbox::with_name("Trivia", "noreply@example.com")?,
//!     )
//!     .port(587)
//!     .build();
//!
//!     let mailer = Mailer::new(config)?;
//!     let message = OutboundMessage::new(
//!         "player@example.com",
//!         "Password Reset Request",
//!         "Reset link: https://example.com/reset-password/abc",
//!     )?;
//!
//!     let delivery = mailer.send(&message).await?;
//!     println!("accepted: {}", delivery.message_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transports, STARTTLS and the line stream
//! - [`data`]: DATA payload encoding (dot-stuffing)
//! - [`parser`]: Reply parser
//! - [`session`]: The protocol state machine
//! - [`types`]: Addresses, replies, messages

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
mod config;
pub mod connection;
pub mod data;
mod error;
mod mailer;
pub mod parser;
pub mod session;
pub mod types;

pub use config::{Credentials, DEFAULT_PORT, RelayConfig, RelayConfigBuilder, validate_identity};
pub use connection::{Connector, SmtpStream, TcpConnector, TlsVerification};
pub use error::{Error, ErrorKind, Result};
pub use mailer::{Delivery, Mailer};
pub use session::{Session, SessionState};
pub use types::{
    Address, BodyFormat, Mailbox, OutboundMessage, Reply, ReplyClass, ReplyCode,
};
