//! Relay transports: opening the plain connection and the STARTTLS upgrade.
//!
//! The session only ever sees an [`SmtpStream`] over some
//! `AsyncRead + AsyncWrite` transport. A [`Connector`] supplies the plain
//! transport and knows how to wrap it in TLS, so every step after the upgrade
//! is written once, independent of the transport underneath.

mod stream;
mod tls;

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

pub use stream::{MAX_REPLY_LINE, MAX_REPLY_LINES, SmtpStream};
pub use tls::{TlsVerification, create_tls_connector};

use crate::error::{Error, Result};

/// Opens relay transports and upgrades them to TLS.
pub trait Connector: Send + Sync {
    /// Transport before STARTTLS.
    type Plain: AsyncRead + AsyncWrite + Unpin + Send;
    /// Transport after STARTTLS.
    type Secure: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a plain connection to the relay.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = io::Result<Self::Plain>> + Send;

    /// Performs the TLS handshake over an already-open plain connection.
    fn upgrade(
        &self,
        stream: Self::Plain,
        host: &str,
    ) -> impl Future<Output = Result<Self::Secure>> + Send;
}

/// TCP connector with rustls for the upgrade.
#[derive(Clone)]
pub struct TcpConnector {
    tls: TlsConnector,
    verification: TlsVerification,
}

impl TcpConnector {
    /// Creates a connector with the given certificate policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration cannot be built.
    pub fn new(verification: TlsVerification) -> Result<Self> {
        Ok(Self {
            tls: create_tls_connector(verification)?,
            verification,
        })
    }

    /// Returns the certificate policy.
    #[must_use]
    pub const fn verification(&self) -> TlsVerification {
        self.verification
    }
}

impl std::fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnector")
            .field("verification", &self.verification)
            .finish_non_exhaustive()
    }
}

impl Connector for TcpConnector {
    type Plain = TcpStream;
    type Secure = TlsStream<TcpStream>;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    async fn upgrade(&self, stream: TcpStream, host: &str) -> Result<TlsStream<TcpStream>> {
        let server_name = tls::server_name(host)?;
        self.tls
            .connect(server_name, stream)
            .await
            .map_err(|e| Error::Tls(format!("Handshake with {host} failed: {e}")))
    }
}
