//! Core SMTP types.

mod address;
mod header;
mod message;
mod reply;

pub use address::{Address, Mailbox};
pub use header::{encode_if_needed, encode_word};
pub use message::{BodyFormat, OutboundMessage};
pub use reply::{Reply, ReplyClass, ReplyCode};
