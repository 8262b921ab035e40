//! SMTP session state machine.
//!
//! One [`Session`] drives one connection. Each protocol step is a row in the
//! step table ([`SessionState::expected_reply`]) executed by a single function,
//! [`Session::step`]: send the command, wait for exactly one reply under the
//! step deadline, compare its code with the one the current state expects,
//! then advance. Any mismatch moves the session to [`SessionState::Failed`].
//!
//! ```text
//! AwaitGreeting ─220→ Ehlo ─250→ StartTls ─220→ (TLS) → SecureEhlo ─250→
//! AuthLoginUser ─334,334→ AuthLoginPass ─235→ MailFrom ─250→ RcptTo ─250→
//! Data ─354→ TransmitBody ─250→ Quit ─221→ Closed
//! ```

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::Command;
use crate::connection::{Connector, SmtpStream};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{Reply, ReplyCode};

/// Position in the protocol sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Opening the transport.
    Connecting,
    /// Waiting for the 220 greeting.
    AwaitGreeting,
    /// First EHLO, in plaintext.
    Ehlo,
    /// STARTTLS command and TLS handshake.
    StartTls,
    /// EHLO again over TLS.
    SecureEhlo,
    /// `AUTH LOGIN` and the username exchange.
    AuthLoginUser,
    /// Password exchange.
    AuthLoginPass,
    /// `MAIL FROM`.
    MailFrom,
    /// `RCPT TO`.
    RcptTo,
    /// `DATA`.
    Data,
    /// Message content and terminator.
    TransmitBody,
    /// `QUIT`, best effort.
    Quit,
    /// Terminal: transport released.
    Closed,
    /// Terminal: the session failed.
    Failed(ErrorKind),
}

impl SessionState {
    /// The single reply code that lets this step proceed.
    #[must_use]
    pub const fn expected_reply(self) -> Option<ReplyCode> {
        match self {
            Self::AwaitGreeting | Self::StartTls => Some(ReplyCode::SERVICE_READY),
            Self::Ehlo
            | Self::SecureEhlo
            | Self::MailFrom
            | Self::RcptTo
            | Self::TransmitBody => Some(ReplyCode::OK),
            Self::AuthLoginUser => Some(ReplyCode::AUTH_CONTINUE),
            Self::AuthLoginPass => Some(ReplyCode::AUTH_SUCCESS),
            Self::Data => Some(ReplyCode::START_DATA),
            Self::Quit => Some(ReplyCode::CLOSING),
            Self::Connecting | Self::Closed | Self::Failed(_) => None,
        }
    }

    /// Returns true for `Closed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }

    const fn ordinal(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::AwaitGreeting => 1,
            Self::Ehlo => 2,
            Self::StartTls => 3,
            Self::SecureEhlo => 4,
            Self::AuthLoginUser => 5,
            Self::AuthLoginPass => 6,
            Self::MailFrom => 7,
            Self::RcptTo => 8,
            Self::Data => 9,
            Self::TransmitBody => 10,
            Self::Quit => 11,
            Self::Closed | Self::Failed(_) => 12,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => f.write_str("connect"),
            Self::AwaitGreeting => f.write_str("greeting"),
            Self::Ehlo => f.write_str("EHLO"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::SecureEhlo => f.write_str("EHLO (TLS)"),
            Self::AuthLoginUser => f.write_str("AUTH LOGIN (username)"),
            Self::AuthLoginPass => f.write_str("AUTH LOGIN (password)"),
            Self::MailFrom => f.write_str("MAIL FROM"),
            Self::RcptTo => f.write_str("RCPT TO"),
            Self::Data => f.write_str("DATA"),
            Self::TransmitBody => f.write_str("message transmission"),
            Self::Quit => f.write_str("QUIT"),
            Self::Closed => f.write_str("closed"),
            Self::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// What a step writes before waiting for its reply.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// Nothing; only wait (the greeting).
    None,
    /// A command line.
    Command(&'a Command),
    /// Encoded message data, terminator included.
    Data(&'a [u8]),
}

/// One SMTP session over one transport.
#[derive(Debug)]
pub struct Session<S> {
    stream: SmtpStream<S>,
    state: SessionState,
    io_timeout: Duration,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Starts a session on a freshly opened transport, awaiting the greeting.
    pub fn new(stream: S, io_timeout: Duration) -> Self {
        Self::resume(SmtpStream::new(stream), SessionState::AwaitGreeting, io_timeout)
    }

    const fn resume(stream: SmtpStream<S>, state: SessionState, io_timeout: Duration) -> Self {
        Self {
            stream,
            state,
            io_timeout,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Executes one step of the table.
    ///
    /// Writes `payload`, reads one reply within the I/O deadline, checks it
    /// against the code the current state expects and moves to `next`.
    /// `next` may equal the current state for multi-exchange steps.
    ///
    /// # Errors
    ///
    /// Returns the step's failure and leaves the session in `Failed`.
    pub async fn step(&mut self, payload: Payload<'_>, next: SessionState) -> Result<Reply> {
        let Some(expected) = self.state.expected_reply() else {
            return Err(self.fail(Error::Protocol(format!(
                "No step defined in state {}",
                self.state
            ))));
        };
        debug_assert!(next.ordinal() >= self.state.ordinal());

        let state = self.state;
        let io_timeout = self.io_timeout;
        let stream = &mut self.stream;
        let exchange = async move {
            match payload {
                Payload::None => {}
                Payload::Command(command) => {
                    tracing::debug!(%state, ?command, "C:");
                    stream.write_all(&command.serialize()).await?;
                }
                Payload::Data(data) => {
                    tracing::debug!(%state, bytes = data.len(), "C: <message data>");
                    stream.write_all(data).await?;
                }
            }
            stream.read_reply().await
        };

        let reply = match tokio::time::timeout(io_timeout, exchange).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(self.fail(self.transport_error(e))),
            Err(_) => {
                return Err(self.fail(Error::Timeout {
                    state,
                    after: io_timeout,
                }));
            }
        };
        tracing::debug!(%state, code = %reply.code, "S: {}", reply.message_text());

        if reply.code != expected {
            let err = self.rejection(&payload, expected, &reply);
            return Err(self.fail(err));
        }

        self.state = next;
        Ok(reply)
    }

    /// Upgrades the transport after a successful STARTTLS reply.
    ///
    /// The session continues in `SecureEhlo` over the connector's secure
    /// transport. On failure the plain transport is dropped.
    ///
    /// # Errors
    ///
    /// Returns a TLS error if the handshake fails, a timeout if it does not
    /// finish within the I/O deadline, or a protocol error if the relay sent
    /// data ahead of the handshake.
    pub async fn upgrade<C>(self, connector: &C, host: &str) -> Result<Session<C::Secure>>
    where
        C: Connector<Plain = S>,
    {
        if self.state != SessionState::StartTls {
            return Err(Error::Protocol(format!(
                "TLS upgrade attempted in state {}",
                self.state
            )));
        }

        let io_timeout = self.io_timeout;
        let plain = self.stream.into_inner()?;

        let secure = match tokio::time::timeout(io_timeout, connector.upgrade(plain, host)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout {
                    state: SessionState::StartTls,
                    after: io_timeout,
                });
            }
        };
        tracing::debug!(host, "TLS established");

        Ok(Session::resume(
            SmtpStream::new(secure),
            SessionState::SecureEhlo,
            io_timeout,
        ))
    }

    /// Sends QUIT and waits for 221.
    ///
    /// Failures are logged, not returned, and the session ends `Closed`
    /// either way: the message was already accepted.
    pub async fn quit(&mut self) {
        if self.state != SessionState::Quit {
            return;
        }
        if let Err(e) = self
            .step(Payload::Command(&Command::Quit), SessionState::Closed)
            .await
        {
            tracing::warn!(error = %e, "QUIT not acknowledged");
        }
        self.state = SessionState::Closed;
    }

    /// Releases the transport and returns the terminal state.
    pub async fn close(self) -> SessionState {
        self.stream.close(self.io_timeout).await;
        match self.state {
            SessionState::Failed(kind) => SessionState::Failed(kind),
            _ => SessionState::Closed,
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = SessionState::Failed(err.kind());
        err
    }

    fn transport_error(&self, err: Error) -> Error {
        match err {
            Error::Connection(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::ConnectionClosed(self.state)
            }
            other => other,
        }
    }

    /// Maps an unexpected reply to the failure kind of the current step.
    fn rejection(&self, payload: &Payload<'_>, expected: ReplyCode, reply: &Reply) -> Error {
        match (self.state, payload) {
            (SessionState::AuthLoginUser | SessionState::AuthLoginPass, _) => Error::AuthRejected {
                code: reply.code,
                message: reply.message_text(),
            },
            (SessionState::RcptTo, Payload::Command(Command::RcptTo { to })) => {
                Error::RecipientRejected {
                    recipient: to.to_string(),
                    code: reply.code,
                    message: reply.message_text(),
                }
            }
            (state, _) => Error::UnexpectedReply {
                state,
                expected,
                code: reply.code,
                message: reply.message_text(),
            },
        }
    }
}
