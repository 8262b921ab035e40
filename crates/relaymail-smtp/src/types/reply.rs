//! Relay replies and reply codes.

/// One complete reply, all continuation lines folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The three-digit code shared by every line.
    pub code: ReplyCode,
    /// Text after the code, one entry per line.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true for a 2yz reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code.class(), ReplyClass::Completed)
    }

    /// Joins the text lines with `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

/// First-digit category of a reply code (RFC 5321 section 4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyClass {
    /// 2yz: the command succeeded.
    Completed,
    /// 3yz: the relay waits for more input.
    Intermediate,
    /// 4yz: failure that may clear up on retry.
    Transient,
    /// 5yz: failure that will not clear up on retry.
    Permanent,
}

/// A three-digit reply code in the range 200..=599.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220, greeting and STARTTLS go-ahead.
    pub const SERVICE_READY: Self = Self(220);
    /// 221, reply to QUIT.
    pub const CLOSING: Self = Self(221);
    /// 235, AUTH accepted.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250, command completed.
    pub const OK: Self = Self(250);
    /// 334, AUTH challenge.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354, send the message data.
    pub const START_DATA: Self = Self(354);
    /// 421, the relay is shutting the channel.
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 451, local processing error.
    pub const LOCAL_ERROR: Self = Self(451);
    /// 535, credentials refused.
    pub const AUTH_FAILED: Self = Self(535);
    /// 550, mailbox unavailable.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 554, transaction failed or no service.
    pub const TRANSACTION_FAILED: Self = Self(554);

    /// Wraps a numeric code. The parser only produces 200..=599.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the category given by the first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completed,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            _ => ReplyClass::Permanent,
        }
    }

    /// Returns true for 4yz.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::Transient)
    }

    /// Returns true for 5yz.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::Permanent)
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
