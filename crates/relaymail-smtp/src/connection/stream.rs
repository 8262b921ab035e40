//! Buffered SMTP line stream over any transport.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::Reply;

/// Longest reply line accepted, CRLF included (RFC 5321 allows 512).
pub const MAX_REPLY_LINE: usize = 1000;

/// Most lines accepted in one multi-line reply.
pub const MAX_REPLY_LINES: usize = 128;

/// SMTP stream: a buffered reader/writer over a plain or encrypted transport.
#[derive(Debug)]
pub struct SmtpStream<S> {
    reader: BufReader<S>,
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a transport.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    /// Reads a line from the stream, without the line terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails, the relay closed the connection,
    /// or the line exceeds [`MAX_REPLY_LINE`].
    pub async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_REPLY_LINE as u64)
            .read_until(b'\n', &mut buf)
            .await?;

        if read == 0 {
            return Err(Error::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by relay",
            )));
        }
        if buf.last() != Some(&b'\n') {
            if buf.len() >= MAX_REPLY_LINE {
                return Err(Error::Protocol(format!(
                    "Reply line exceeds {MAX_REPLY_LINE} bytes"
                )));
            }
            return Err(Error::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by relay mid-line",
            )));
        }

        Ok(String::from_utf8_lossy(&buf).trim_end().to_string())
    }

    /// Reads a complete (possibly multi-line) reply.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the reply is malformed.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(Error::Protocol(format!(
                    "Reply exceeds {MAX_REPLY_LINES} lines"
                )));
            }
        }

        parse_reply(&lines)
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Unwraps the transport for a TLS upgrade.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the relay already sent bytes past the last
    /// reply; those would otherwise be read as if they came over TLS.
    pub fn into_inner(self) -> Result<S> {
        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "Relay sent data before the TLS handshake".into(),
            ));
        }
        Ok(self.reader.into_inner())
    }

    /// Shuts the transport down, waiting at most `limit`, and drops it.
    pub async fn close(self, limit: Duration) {
        let mut stream = self.reader.into_inner();
        match tokio::time::timeout(limit, stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Shutdown failed"),
            Err(_) => tracing::debug!("Shutdown timed out"),
        }
    }
}
