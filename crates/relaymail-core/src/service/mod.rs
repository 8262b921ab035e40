//! Services for sending application email.
//!
//! This module bridges application code and the SMTP engine: one
//! caller-facing send operation and the password-reset notices.

pub mod email;
pub mod notify;

pub use email::{EmailRequest, EmailSender, send_email};
pub use notify::{
    Notice, NoticeKind, Notifier, Outcome, RESET_CONFIRMATION_SUBJECT, RESET_REQUEST_SUBJECT,
    reset_confirmation_notice, reset_request_notice, reset_url,
};
