//! One-message-per-connection delivery.

use std::sync::Arc;

use crate::command::Command;
use crate::config::RelayConfig;
use crate::connection::{Connector, TcpConnector};
use crate::data::encode_data;
use crate::error::{Error, Result};
use crate::session::{Payload, Session, SessionState};
use crate::types::{OutboundMessage, Reply, ReplyCode};

/// The relay's acceptance of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Reply to the end-of-data marker (250, usually with a queue id).
    pub reply: Reply,
}

impl Delivery {
    /// Returns the acceptance code.
    #[must_use]
    pub const fn code(&self) -> ReplyCode {
        self.reply.code
    }

    /// Returns the relay's acceptance text.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.reply.message_text()
    }
}

/// Sends messages through one relay, one connection per message.
///
/// Cloning is cheap; clones share the configuration.
#[derive(Debug, Clone)]
pub struct Mailer<C = TcpConnector> {
    config: Arc<RelayConfig>,
    connector: C,
}

impl Mailer<TcpConnector> {
    /// Creates a mailer that connects over TCP and upgrades with rustls.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let connector = TcpConnector::new(config.tls)?;
        Ok(Self::with_connector(config, connector))
    }
}

impl<C: Connector> Mailer<C> {
    /// Creates a mailer with a custom transport connector.
    #[must_use]
    pub fn with_connector(config: RelayConfig, connector: C) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Returns the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Delivers one message.
    ///
    /// Opens a connection, runs the full exchange from greeting to QUIT and
    /// closes the connection on every path. The message counts as sent only
    /// once the relay acknowledged the data; a failed QUIT afterwards does not
    /// change that.
    ///
    /// # Errors
    ///
    /// Returns the first failure; see [`Error::kind`]. An invalid relay
    /// configuration fails before any connection is opened.
    pub async fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        let config = &*self.config;
        config.validate()?;
        tracing::debug!(
            host = %config.host,
            port = config.port,
            recipient = %message.recipient(),
            "Connecting to relay"
        );

        let connect = self.connector.connect(&config.host, config.port);
        let plain = match tokio::time::timeout(config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::Connection(e)),
            Err(_) => {
                return Err(Error::Timeout {
                    state: SessionState::Connecting,
                    after: config.connect_timeout,
                });
            }
        };

        let mut session = Session::new(plain, config.io_timeout);
        if let Err(e) = self.negotiate(&mut session).await {
            session.close().await;
            return Err(e);
        }

        let mut session = session.upgrade(&self.connector, &config.host).await?;
        match self.transact(&mut session, message).await {
            Ok(delivery) => {
                session.quit().await;
                session.close().await;
                tracing::info!(
                    recipient = %message.recipient(),
                    reply = %delivery.message_text(),
                    "Message accepted by relay"
                );
                Ok(delivery)
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// Greeting, EHLO and STARTTLS over the plain transport.
    async fn negotiate(&self, session: &mut Session<C::Plain>) -> Result<()> {
        let ehlo = Command::Ehlo {
            hostname: self.config.local_identity.clone(),
        };

        session.step(Payload::None, SessionState::Ehlo).await?;
        session
            .step(Payload::Command(&ehlo), SessionState::StartTls)
            .await?;
        session
            .step(Payload::Command(&Command::StartTls), SessionState::StartTls)
            .await?;
        Ok(())
    }

    /// Everything after the TLS upgrade up to the data acknowledgement.
    async fn transact(
        &self,
        session: &mut Session<C::Secure>,
        message: &OutboundMessage,
    ) -> Result<Delivery> {
        let config = &*self.config;
        let ehlo = Command::Ehlo {
            hostname: config.local_identity.clone(),
        };
        let user = Command::AuthResponse(config.credentials.encoded_account_name());
        let pass = Command::AuthResponse(config.credentials.encoded_secret());
        let mail_from = Command::MailFrom {
            from: config.sender.address.clone(),
        };
        let rcpt_to = Command::RcptTo {
            to: message.recipient().clone(),
        };
        let data = encode_data(message.render(&config.sender).as_bytes());

        session
            .step(Payload::Command(&ehlo), SessionState::AuthLoginUser)
            .await?;
        session
            .step(Payload::Command(&Command::AuthLogin), SessionState::AuthLoginUser)
            .await?;
        session
            .step(Payload::Command(&user), SessionState::AuthLoginPass)
            .await?;
        session
            .step(Payload::Command(&pass), SessionState::MailFrom)
            .await?;
        session
            .step(Payload::Command(&mail_from), SessionState::RcptTo)
            .await?;
        session
            .step(Payload::Command(&rcpt_to), SessionState::Data)
            .await?;
        session
            .step(Payload::Command(&Command::Data), SessionState::TransmitBody)
            .await?;
        let reply = session
            .step(Payload::Data(&data), SessionState::Quit)
            .await?;

        Ok(Delivery { reply })
    }
}
