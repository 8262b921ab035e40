//! Outbound message model and RFC 5322 rendering.

use std::fmt::Write;

use chrono::{DateTime, Local};

use super::{Address, Mailbox};
use super::header::encode_if_needed;
use crate::error::{Error, Result};

/// Body media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// `text/html`
    #[default]
    Html,
    /// `text/plain`
    PlainText,
}

impl BodyFormat {
    /// Returns the `Content-Type` header value.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::PlainText => "text/plain; charset=utf-8",
        }
    }
}

/// A single-recipient, single-part email.
///
/// Validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    recipient: Address,
    subject: String,
    body: String,
    format: BodyFormat,
}

impl OutboundMessage {
    /// Creates a message with an HTML body.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient is implausible, or the subject or body is
    /// empty, or the subject contains a line break.
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self> {
        Self::with_format(recipient, subject, body, BodyFormat::Html)
    }

    /// Creates a message with an explicit body format.
    ///
    /// # Errors
    ///
    /// See [`OutboundMessage::new`].
    pub fn with_format(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        format: BodyFormat,
    ) -> Result<Self> {
        let recipient = Address::new(recipient)?;
        let subject = subject.into();
        let body = body.into();

        if subject.trim().is_empty() {
            return Err(Error::InvalidMessage("Subject cannot be empty".into()));
        }
        if subject.contains(['\r', '\n']) {
            return Err(Error::InvalidMessage(
                "Subject cannot contain line breaks".into(),
            ));
        }
        if body.trim().is_empty() {
            return Err(Error::InvalidMessage("Body cannot be empty".into()));
        }

        Ok(Self {
            recipient,
            subject,
            body,
            format,
        })
    }

    /// Returns the recipient.
    #[must_use]
    pub const fn recipient(&self) -> &Address {
        &self.recipient
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the body format.
    #[must_use]
    pub const fn format(&self) -> BodyFormat {
        self.format
    }

    /// Renders headers and body with CRLF line endings, dated now.
    #[must_use]
    pub fn render(&self, from: &Mailbox) -> String {
        self.render_at(from, Local::now())
    }

    /// Renders headers and body with CRLF line endings.
    ///
    /// The body is copied as-is; line ending normalization and dot-stuffing
    /// happen when the data is sent.
    #[must_use]
    pub fn render_at(&self, from: &Mailbox, date: DateTime<Local>) -> String {
        let mut message = String::with_capacity(self.body.len() + 256);

        let _ = write!(message, "Date: {}\r\n", date.to_rfc2822());
        let _ = write!(message, "From: {}\r\n", from.to_header_value());
        let _ = write!(message, "To: {}\r\n", self.recipient);
        let _ = write!(message, "Subject: {}\r\n", encode_if_needed(&self.subject));
        message.push_str("MIME-Version: 1.0\r\n");
        let _ = write!(message, "Content-Type: {}\r\n", self.format.content_type());
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");

        // Empty line between headers and body
        message.push_str("\r\n");

        message.push_str(&self.body);
        message
    }
}
