//! # relaymail-core
//!
//! Application-facing email delivery on top of `relaymail-smtp`.
//!
//! This crate provides:
//! - Settings loading from the environment or JSON
//! - `send_email`, the one-call HTML send
//! - Password-reset notices, sent in the background

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod service;
pub mod settings;

pub use error::{Error, Result};
pub use service::{
    EmailRequest, EmailSender, Notice, NoticeKind, Notifier, Outcome, reset_confirmation_notice,
    reset_request_notice, reset_url, send_email,
};
pub use settings::MailerSettings;
