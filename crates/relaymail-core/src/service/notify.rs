//! Password-reset notices and background delivery.
//!
//! A reset request must answer the requester the same way whether or not the
//! mail went out, so notices are sent on a spawned task and their outcome is
//! only logged.

use std::sync::Arc;

use relaymail_smtp::{BodyFormat, Delivery, ErrorKind, OutboundMessage};
use tokio::task::JoinHandle;

use super::email::EmailSender;

/// Subject of the reset request notice.
pub const RESET_REQUEST_SUBJECT: &str = "Password Reset Request";

/// Subject of the reset confirmation notice.
pub const RESET_CONFIRMATION_SUBJECT: &str = "Your password has been reset";

/// Which notice is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// A reset link was requested.
    ResetRequested,
    /// The password was changed through a reset link.
    ResetCompleted,
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResetRequested => write!(f, "reset_requested"),
            Self::ResetCompleted => write!(f, "reset_completed"),
        }
    }
}

/// A ready-to-send notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Notice kind, for logging.
    pub kind: NoticeKind,
    /// The message itself.
    pub message: OutboundMessage,
}

/// Result of a background delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The relay accepted the notice.
    Delivered(Delivery),
    /// Delivery failed; the failure was logged.
    Failed(ErrorKind),
}

impl Outcome {
    /// Returns true if the notice was accepted.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Builds the link a user follows to choose a new password.
#[must_use]
pub fn reset_url(client_url: &str, token: &str) -> String {
    format!("{}/reset-password/{token}", client_url.trim_end_matches('/'))
}

/// Builds the plain-text notice carrying a reset link.
///
/// # Errors
///
/// Returns an error if the recipient is not a plausible address.
pub fn reset_request_notice(recipient: &str, reset_url: &str) -> relaymail_smtp::Result<Notice> {
    let body = format!(
        "Password Reset Request\r\n\
         You requested a password reset. Please copy and paste the following URL \
         into your browser to reset your password:\r\n\
         \r\n\
         {reset_url}\r\n\
         \r\n\
         If you did not request this, please ignore this email and your password \
         will remain unchanged.\r\n\
         This link is valid for 1 hour.\r\n"
    );
    Ok(Notice {
        kind: NoticeKind::ResetRequested,
        message: OutboundMessage::with_format(
            recipient,
            RESET_REQUEST_SUBJECT,
            body,
            BodyFormat::PlainText,
        )?,
    })
}

/// Builds the plain-text notice confirming a completed reset.
///
/// # Errors
///
/// Returns an error if the recipient is not a plausible address.
pub fn reset_confirmation_notice(recipient: &str) -> relaymail_smtp::Result<Notice> {
    let body = "Your password has been reset\r\n\
                The password for your account was just changed.\r\n\
                \r\n\
                If you did not make this change, request a new password reset \
                right away.\r\n";
    Ok(Notice {
        kind: NoticeKind::ResetCompleted,
        message: OutboundMessage::with_format(
            recipient,
            RESET_CONFIRMATION_SUBJECT,
            body,
            BodyFormat::PlainText,
        )?,
    })
}

/// Sends notices in the background.
pub struct Notifier<S> {
    sender: Arc<S>,
    client_url: String,
}

impl<S> Clone for Notifier<S> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            client_url: self.client_url.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Notifier<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("client_url", &self.client_url)
            .finish_non_exhaustive()
    }
}

impl<S: EmailSender + 'static> Notifier<S> {
    /// Creates a notifier; `client_url` is the base of reset links.
    #[must_use]
    pub fn new(sender: S, client_url: impl Into<String>) -> Self {
        Self {
            sender: Arc::new(sender),
            client_url: client_url.into(),
        }
    }

    /// Returns the base URL used for reset links.
    #[must_use]
    pub fn client_url(&self) -> &str {
        &self.client_url
    }

    /// Spawns delivery of a notice and returns immediately.
    ///
    /// Must be called from within a tokio runtime. The handle resolves to the
    /// outcome; dropping it does not cancel the send.
    pub fn dispatch(&self, notice: Notice) -> JoinHandle<Outcome> {
        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            let Notice { kind, message } = notice;
            match sender.deliver(&message).await {
                Ok(delivery) => {
                    tracing::info!(
                        notice = %kind,
                        recipient = %message.recipient(),
                        reply = %delivery.message_text(),
                        "Notice delivered"
                    );
                    Outcome::Delivered(delivery)
                }
                Err(e) => {
                    tracing::error!(
                        notice = %kind,
                        recipient = %message.recipient(),
                        kind = %e.kind(),
                        error = %e,
                        "Notice delivery failed"
                    );
                    Outcome::Failed(e.kind())
                }
            }
        })
    }

    /// Sends the reset link for `token` in the background.
    ///
    /// Returns `None` if the notice could not be built; the reason is logged.
    pub fn reset_requested(&self, recipient: &str, token: &str) -> Option<JoinHandle<Outcome>> {
        let url = reset_url(&self.client_url, token);
        self.build_and_dispatch(NoticeKind::ResetRequested, || {
            reset_request_notice(recipient, &url)
        })
    }

    /// Sends the reset confirmation in the background.
    ///
    /// Returns `None` if the notice could not be built; the reason is logged.
    pub fn reset_completed(&self, recipient: &str) -> Option<JoinHandle<Outcome>> {
        self.build_and_dispatch(NoticeKind::ResetCompleted, || {
            reset_confirmation_notice(recipient)
        })
    }

    fn build_and_dispatch(
        &self,
        kind: NoticeKind,
        build: impl FnOnce() -> relaymail_smtp::Result<Notice>,
    ) -> Option<JoinHandle<Outcome>> {
        match build() {
            Ok(notice) => Some(self.dispatch(notice)),
            Err(e) => {
                tracing::error!(notice = %kind, kind = %e.kind(), error = %e, "Notice not sent");
                None
            }
        }
    }
}
