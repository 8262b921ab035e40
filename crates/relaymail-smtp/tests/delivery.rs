//! End-to-end tests for `Mailer::send`.
//!
//! A scripted relay listens on loopback and records every line it receives.
//! The connector skips the TLS handshake so the whole exchange stays readable;
//! the real rustls upgrade is covered separately.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::similar_names)]

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use relaymail_smtp::{
    Connector, Credentials, Error, ErrorKind, Mailbox, Mailer, OutboundMessage, RelayConfig,
    SessionState, TlsVerification,
};

/// Opens loopback TCP and treats the plain stream as already secure.
#[derive(Debug, Clone, Copy)]
struct PlainConnector;

impl Connector for PlainConnector {
    type Plain = TcpStream;
    type Secure = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        TcpStream::connect((host, port)).await
    }

    async fn upgrade(&self, stream: TcpStream, _host: &str) -> relaymail_smtp::Result<TcpStream> {
        Ok(stream)
    }
}

/// Never finishes opening a connection.
#[derive(Debug, Clone, Copy)]
struct StalledConnector;

impl Connector for StalledConnector {
    type Plain = TcpStream;
    type Secure = TcpStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<TcpStream> {
        std::future::pending().await
    }

    async fn upgrade(&self, stream: TcpStream, _host: &str) -> relaymail_smtp::Result<TcpStream> {
        Ok(stream)
    }
}

/// Per-step replies; `None` means the relay goes silent at that step.
#[derive(Debug, Clone)]
struct Script {
    replies: HashMap<&'static str, Option<&'static str>>,
}

impl Script {
    fn accept_all() -> Self {
        let replies = [
            ("greeting", "220 mock.relay ESMTP"),
            ("ehlo", "250-mock.relay\r\n250-STARTTLS\r\n250 AUTH LOGIN PLAIN"),
            ("starttls", "220 2.0.0 Ready to start TLS"),
            ("auth", "334 VXNlcm5hbWU6"),
            ("user", "334 UGFzc3dvcmQ6"),
            ("pass", "235 2.7.0 Authentication successful"),
            ("mail", "250 2.1.0 Ok"),
            ("rcpt", "250 2.1.5 Ok"),
            ("data", "354 End data with <CR><LF>.<CR><LF>"),
            ("body", "250 2.0.0 Ok: queued as ABC123"),
            ("quit", "221 2.0.0 Bye"),
        ]
        .into_iter()
        .map(|(step, reply)| (step, Some(reply)))
        .collect();
        Self { replies }
    }

    fn reply(mut self, step: &'static str, reply: &'static str) -> Self {
        self.replies.insert(step, Some(reply));
        self
    }

    fn silent(mut self, step: &'static str) -> Self {
        self.replies.insert(step, None);
        self
    }
}

/// Everything the relay received on one connection, in order.
/// The DATA payload is recorded as a single entry, terminator included.
type Transcript = Vec<String>;

async fn serve(socket: TcpStream, script: Script) -> Transcript {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    let mut transcript = Vec::new();
    let mut auth_stage = 0;

    let mut step = "greeting";
    loop {
        match script.replies[step] {
            Some(reply) => {
                write
                    .write_all(format!("{reply}\r\n").as_bytes())
                    .await
                    .unwrap();
            }
            None => {
                // Wait for the client to give up and close.
                let mut rest = Vec::new();
                let _ = reader.read_to_end(&mut rest).await;
                if !rest.is_empty() {
                    transcript.push(String::from_utf8_lossy(&rest).into_owned());
                }
                return transcript;
            }
        }
        if step == "quit" {
            return transcript;
        }

        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            return transcript;
        }
        let line = line.trim_end().to_string();

        step = match auth_stage {
            1 => {
                auth_stage = 2;
                "user"
            }
            2 => {
                auth_stage = 0;
                "pass"
            }
            _ => match line.split_whitespace().next().unwrap_or_default() {
                "EHLO" => "ehlo",
                "STARTTLS" => "starttls",
                "AUTH" => {
                    auth_stage = 1;
                    "auth"
                }
                "MAIL" => "mail",
                "RCPT" => "rcpt",
                "DATA" => "data",
                "QUIT" => "quit",
                other => panic!("unexpected command {other:?}"),
            },
        };
        transcript.push(line);

        let accepts_data = script.replies["data"].is_some_and(|reply| reply.starts_with("354"));
        if step == "data" && accepts_data {
            write
                .write_all(format!("{}\r\n", script.replies["data"].unwrap()).as_bytes())
                .await
                .unwrap();

            let mut payload = String::new();
            loop {
                let mut data_line = String::new();
                if reader.read_line(&mut data_line).await.unwrap_or(0) == 0 {
                    return transcript;
                }
                payload.push_str(&data_line);
                if data_line == ".\r\n" {
                    break;
                }
            }
            transcript.push(payload);
            step = "body";
        }
    }
}

/// Starts a relay that serves `connections` clients with the same script.
async fn spawn_relay(script: Script, connections: usize) -> (u16, JoinHandle<Vec<Transcript>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut sessions = Vec::new();
        for _ in 0..connections {
            let (socket, _) = listener.accept().await.unwrap();
            sessions.push(tokio::spawn(serve(socket, script.clone())));
        }
        let mut transcripts = Vec::new();
        for session in sessions {
            transcripts.push(session.await.unwrap());
        }
        transcripts
    });

    (port, handle)
}

fn config(port: u16) -> RelayConfig {
    RelayConfig::builder(
        "127.0.0.1",
        Credentials::new("apikey", "s3cret"),
        Mailbox::with_name("Trivia Game", "noreply@example.com").unwrap(),
    )
    .port(port)
    .local_identity("client.test")
    .connect_timeout(Duration::from_secs(2))
    .io_timeout(Duration::from_secs(2))
    .build()
}

fn reset_message(recipient: &str) -> OutboundMessage {
    OutboundMessage::new(recipient, "Password Reset Request", "Reset link: https://x/y").unwrap()
}

async fn relay_transcript(handle: JoinHandle<Vec<Transcript>>) -> Transcript {
    let mut transcripts = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("relay never saw the connection close")
        .unwrap();
    assert_eq!(transcripts.len(), 1);
    transcripts.remove(0)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_commands_in_protocol_order() {
    init_tracing();
    let (port, relay) = spawn_relay(Script::accept_all(), 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let delivery = mailer.send(&reset_message("a@b.com")).await.unwrap();
    assert_eq!(delivery.code().as_u16(), 250);
    assert_eq!(delivery.message_text(), "2.0.0 Ok: queued as ABC123");

    let transcript = relay_transcript(relay).await;
    let commands: Vec<&str> = transcript.iter().map(String::as_str).collect();
    assert_eq!(commands.len(), 11, "{commands:#?}");
    assert_eq!(
        commands[..9],
        [
            "EHLO client.test",
            "STARTTLS",
            "EHLO client.test",
            "AUTH LOGIN",
            "YXBpa2V5",
            "czNjcmV0",
            "MAIL FROM:<noreply@example.com>",
            "RCPT TO:<a@b.com>",
            "DATA",
        ]
    );
    assert!(commands[9].ends_with("\r\n.\r\n"));
    assert_eq!(commands[10], "QUIT");
}

#[tokio::test]
async fn test_password_reset_payload_headers() {
    let (port, relay) = spawn_relay(Script::accept_all(), 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    mailer.send(&reset_message("a@b.com")).await.unwrap();

    let transcript = relay_transcript(relay).await;
    let payload = &transcript[9];
    let (headers, body) = payload.split_once("\r\n\r\n").unwrap();
    let headers: Vec<&str> = headers.split("\r\n").collect();
    assert!(headers.contains(&"To: a@b.com"));
    assert!(headers.contains(&"Subject: Password Reset Request"));
    assert!(headers.contains(&"From: Trivia Game <noreply@example.com>"));
    assert!(headers.contains(&"Content-Type: text/html; charset=utf-8"));
    assert_eq!(body, "Reset link: https://x/y\r\n.\r\n");
}

#[tokio::test]
async fn test_lone_dot_line_is_stuffed_on_the_wire() {
    let (port, relay) = spawn_relay(Script::accept_all(), 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);
    let message = OutboundMessage::new("a@b.com", "Dots", "first\r\n.\r\nlast").unwrap();

    mailer.send(&message).await.unwrap();

    let transcript = relay_transcript(relay).await;
    let body = transcript[9].split_once("\r\n\r\n").unwrap().1;
    assert_eq!(body, "first\r\n..\r\nlast\r\n.\r\n");
}

#[tokio::test]
async fn test_recipient_rejected() {
    let script = Script::accept_all().reply("rcpt", "550 5.1.1 <ghost@b.com>: Recipient address rejected");
    let (port, relay) = spawn_relay(script, 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let err = mailer.send(&reset_message("ghost@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecipientRejected);
    assert!(err.is_permanent());

    let transcript = relay_transcript(relay).await;
    assert_eq!(transcript.last().unwrap(), "RCPT TO:<ghost@b.com>");
}

#[tokio::test]
async fn test_credentials_rejected() {
    let script = Script::accept_all().reply("pass", "535 5.7.8 Authentication credentials invalid");
    let (port, relay) = spawn_relay(script, 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);

    let transcript = relay_transcript(relay).await;
    assert_eq!(transcript.last().unwrap(), "czNjcmV0");
    assert!(!transcript.iter().any(|line| line.starts_with("MAIL FROM")));
}

#[tokio::test]
async fn test_bad_greeting() {
    let script = Script::accept_all().reply("greeting", "554 5.3.2 Service unavailable");
    let (port, relay) = spawn_relay(script, 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(relay_transcript(relay).await.is_empty());
}

#[tokio::test]
async fn test_message_refused_after_data() {
    let script = Script::accept_all().reply("body", "554 5.7.1 Message rejected as spam");
    let (port, relay) = spawn_relay(script, 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);

    let transcript = relay_transcript(relay).await;
    assert!(!transcript.iter().any(|line| line == "QUIT"));
}

#[tokio::test]
async fn test_quit_failure_keeps_success() {
    let script = Script::accept_all().reply("quit", "500 5.5.1 What?");
    let (port, relay) = spawn_relay(script, 1).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let delivery = mailer.send(&reset_message("a@b.com")).await.unwrap();
    assert_eq!(delivery.code().as_u16(), 250);
    assert_eq!(relay_transcript(relay).await.last().unwrap(), "QUIT");
}

#[tokio::test]
async fn test_silent_relay_times_out_and_closes() {
    let script = Script::accept_all().silent("mail");
    let (port, relay) = spawn_relay(script, 1).await;
    let config = RelayConfig {
        io_timeout: Duration::from_millis(300),
        ..config(port)
    };
    let mailer = Mailer::with_connector(config, PlainConnector);

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // The relay only returns once it reads EOF: the client closed without
    // writing anything after MAIL FROM.
    let transcript = relay_transcript(relay).await;
    assert_eq!(transcript.last().unwrap(), "MAIL FROM:<noreply@example.com>");
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mailer = Mailer::with_connector(config(port), PlainConnector);
    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_concurrent_sends_are_independent() {
    let (port, relay) = spawn_relay(Script::accept_all(), 2).await;
    let mailer = Mailer::with_connector(config(port), PlainConnector);

    let first = reset_message("first@b.com");
    let second = reset_message("second@b.com");
    let (a, b) = tokio::join!(mailer.send(&first), mailer.send(&second));
    a.unwrap();
    b.unwrap();

    let transcripts = tokio::time::timeout(Duration::from_secs(5), relay)
        .await
        .unwrap()
        .unwrap();
    let mut recipients = Vec::new();
    for transcript in &transcripts {
        assert_eq!(transcript.len(), 11);
        let rcpts: Vec<&String> = transcript
            .iter()
            .filter(|line| line.starts_with("RCPT TO"))
            .collect();
        assert_eq!(rcpts.len(), 1);
        let recipient = rcpts[0].trim_start_matches("RCPT TO:");
        assert!(transcript[9].contains(&format!("To: {}", recipient.trim_matches(['<', '>']))));
        recipients.push(recipient.to_string());
    }
    recipients.sort();
    assert_eq!(recipients, ["<first@b.com>", "<second@b.com>"]);
}

#[tokio::test]
async fn test_tls_handshake_failure_with_rustls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let relay = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let mut line = String::new();

        reader.get_mut().write_all(b"220 mock.relay ESMTP\r\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        reader
            .get_mut()
            .write_all(b"250-mock.relay\r\n250 STARTTLS\r\n")
            .await
            .unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "STARTTLS\r\n");
        reader.get_mut().write_all(b"220 Go ahead\r\n").await.unwrap();

        // Read the ClientHello, answer with something that is not TLS.
        let mut hello = [0u8; 512];
        let n = reader.read(&mut hello).await.unwrap();
        assert!(n > 0);
        let _ = reader.get_mut().write_all(b"garbage, not a TLS record\r\n").await;
    });

    let config = RelayConfig {
        tls: TlsVerification::Relaxed,
        ..config(port)
    };
    let mailer = Mailer::new(config).unwrap();

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Tls);
    relay.await.unwrap();
}

#[tokio::test]
async fn test_invalid_input_never_connects() {
    assert_eq!(
        OutboundMessage::new("a@b.com", "", "body").unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        OutboundMessage::new("nobody", "Subject", "body").unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
}

#[tokio::test]
async fn test_ehlo_identity_with_line_break_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = RelayConfig {
        local_identity: "client.test\r\nRSET".into(),
        ..config(port)
    };
    let mailer = Mailer::with_connector(config, PlainConnector);

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "relay saw a connection");
}

#[tokio::test(start_paused = true)]
async fn test_connect_deadline() {
    let config = RelayConfig {
        connect_timeout: Duration::from_secs(5),
        ..config(2525)
    };
    let mailer = Mailer::with_connector(config, StalledConnector);

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Timeout { state: SessionState::Connecting, after } if after == Duration::from_secs(5)
    ));
}

#[tokio::test]
async fn test_silent_tls_handshake_times_out_and_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let relay = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let mut line = String::new();

        reader.get_mut().write_all(b"220 mock.relay ESMTP\r\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        reader
            .get_mut()
            .write_all(b"250-mock.relay\r\n250 STARTTLS\r\n")
            .await
            .unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "STARTTLS\r\n");
        reader.get_mut().write_all(b"220 Go ahead\r\n").await.unwrap();

        // Swallow the ClientHello and never answer; returns on EOF.
        let mut rest = Vec::new();
        let _ = reader.read_to_end(&mut rest).await;
        rest.len()
    });

    let config = RelayConfig {
        tls: TlsVerification::Relaxed,
        io_timeout: Duration::from_millis(500),
        ..config(port)
    };
    let mailer = Mailer::new(config).unwrap();

    let err = mailer.send(&reset_message("a@b.com")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Timeout { state: SessionState::StartTls, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let client_hello = tokio::time::timeout(Duration::from_secs(5), relay)
        .await
        .expect("relay never saw the connection close")
        .unwrap();
    assert!(client_hello > 0);
}
