//! Commands the client sends, one line each.

use std::fmt::Write as _;

use crate::types::Address;

/// A client command in the submission sequence.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <identity>`, sent before and after STARTTLS.
    Ehlo {
        /// Name the client announces.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH LOGIN`
    AuthLogin,
    /// Bare base64 line answering a 334 challenge.
    AuthResponse(String),
    /// `MAIL FROM:<addr>`
    MailFrom {
        /// Envelope sender.
        from: Address,
    },
    /// `RCPT TO:<addr>`
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl Command {
    /// Returns the wire form, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = self.line(false);
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Formats the command without terminator, optionally hiding secrets.
    fn line(&self, redact: bool) -> String {
        let mut line = String::new();
        // Writing to a String cannot fail.
        let _ = match self {
            Self::Ehlo { hostname } => write!(line, "EHLO {hostname}"),
            Self::StartTls => line.write_str("STARTTLS"),
            Self::AuthLogin => line.write_str("AUTH LOGIN"),
            Self::AuthResponse(_) if redact => line.write_str("<auth response>"),
            Self::AuthResponse(encoded) => line.write_str(encoded),
            Self::MailFrom { from } => write!(line, "MAIL FROM:<{from}>"),
            Self::RcptTo { to } => write!(line, "RCPT TO:<{to}>"),
            Self::Data => line.write_str("DATA"),
            Self::Quit => line.write_str("QUIT"),
        };
        line
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line(true))
    }
}
