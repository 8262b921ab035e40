//! Caller-facing email sending.
//!
//! Validates a request into an [`OutboundMessage`] and hands it to an
//! [`EmailSender`], normally the SMTP [`Mailer`].

use std::future::Future;

use relaymail_smtp::{Connector, Delivery, Mailer, OutboundMessage};

use crate::error::Result;

/// Anything that can deliver a single outbound message.
pub trait EmailSender: Send + Sync {
    /// Delivers one message and returns the relay's acceptance.
    fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = relaymail_smtp::Result<Delivery>> + Send;
}

impl<C: Connector> EmailSender for Mailer<C> {
    async fn deliver(&self, message: &OutboundMessage) -> relaymail_smtp::Result<Delivery> {
        self.send(message).await
    }
}

/// An HTML email to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body_html: String,
}

impl EmailRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body_html: body_html.into(),
        }
    }
}

/// Sends an HTML email through the given sender.
///
/// The sender is called exactly once, and only when the request is valid.
///
/// # Errors
///
/// Returns an error if the request is invalid or delivery fails.
pub async fn send_email(sender: &impl EmailSender, request: EmailRequest) -> Result<Delivery> {
    let message = OutboundMessage::new(request.recipient, request.subject, request.body_html)?;
    tracing::debug!(recipient = %message.recipient(), "Sending email");
    Ok(sender.deliver(&message).await?)
}
