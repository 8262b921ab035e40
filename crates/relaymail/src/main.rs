//! `relaymail` - send one plain-text email through the configured relay.
//!
//! Usage: `relaymail <recipient> <subject> <body>`
//!
//! Relay settings come from `SMTP_*` / `FROM_*` environment variables, or from
//! the JSON file named by `RELAYMAIL_CONFIG`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::{Context, bail};
use relaymail_core::MailerSettings;
use relaymail_smtp::{BodyFormat, Mailer, OutboundMessage};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: relaymail <recipient> <subject> <body>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaymail=info,relaymail_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [recipient, subject, body] = args.as_slice() else {
        bail!(USAGE);
    };

    let settings = load_settings()?;
    info!(host = %settings.host, port = settings.port, "Using relay");

    let mailer = Mailer::new(settings.relay_config()?).context("Failed to set up TLS")?;
    let message = OutboundMessage::with_format(
        recipient.as_str(),
        subject.as_str(),
        body.as_str(),
        BodyFormat::PlainText,
    )
    .context("Invalid message")?;

    let delivery = mailer
        .send(&message)
        .await
        .with_context(|| format!("Failed to send to {recipient}"))?;

    println!("{} {}", delivery.code(), delivery.message_text());
    Ok(())
}

fn load_settings() -> anyhow::Result<MailerSettings> {
    match std::env::var("RELAYMAIL_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {path}"))?;
            MailerSettings::from_json(&json).with_context(|| format!("Invalid settings in {path}"))
        }
        Err(_) => MailerSettings::from_env().context("Invalid relay settings in environment"),
    }
}
