//! Sending one message over one connection.
//!
//! Connect (with a TLS handshake first for [`Mode::ImplicitTls`]), read the
//! greeting, say `EHLO`, upgrade with `STARTTLS` when the server offers it,
//! authenticate, then `MAIL`, `RCPT` for each recipient, `DATA` and `QUIT`.
//! Each step has its own error and nothing is retried.

use std::time::Duration;

use auth::{
    sasl::{Authenticator, MechanismKind},
    Credentials,
};
use line::{
    stream::{ClientTlsStream, MaybeTls},
    trace::Sink,
};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{info, instrument, warn};

use crate::{
    client::{deadline, AuthError},
    ehlo::{Auth, Extensions},
    reply::{self, Reply},
    tls::{self, InvalidDnsNameError},
    Client, Mode,
};

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
    /// Name sent with `EHLO`.
    pub helo: String,
    /// Skip certificate verification.
    pub insecure: bool,
    /// Limit for connecting and for each reply.
    pub timeout: Option<Duration>,
    /// `None` skips `AUTH`.
    pub credentials: Option<Credentials>,
}

impl Options {
    pub fn new(host: impl Into<String>, port: u16, mode: Mode) -> Self {
        Self {
            host: host.into(),
            port,
            mode,
            helo: "localhost".to_owned(),
            insecure: false,
            timeout: None,
            credentials: None,
        }
    }
}

/// The envelope and the serialized message.
#[derive(Debug, Clone, Copy)]
pub struct Mail<'a> {
    pub from: &'a str,
    pub to: &'a [String],
    pub body: &'a [u8],
}

/// What a successful send looked like.
#[derive(Debug)]
pub struct Outcome {
    /// [`Mode::Plaintext`] if `STARTTLS` was wanted but not offered.
    pub mode: Mode,
    /// The server's reply to the end of data.
    pub reply: Reply,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        source: std::io::Error,
    },
    #[error("invalid server name {0:?}")]
    ServerName(String, #[source] InvalidDnsNameError),
    #[error("TLS negotiation failed")]
    Tls(#[source] reply::Error),
    #[error("server did not greet")]
    Greeting(#[source] reply::Error),
    #[error("server refused EHLO")]
    Hello(#[source] reply::Error),
    #[error("failed to authenticate")]
    Auth(#[source] AuthError),
    #[error("failed to set sender")]
    Sender(#[source] reply::Error),
    #[error("failed to set recipient {recipient}")]
    Recipient {
        recipient: String,
        source: reply::Error,
    },
    #[error("failed to open data connection")]
    DataOpen(#[source] reply::Error),
    #[error("failed to write message")]
    DataWrite(#[source] std::io::Error),
    #[error("failed to close data connection")]
    DataClose(#[source] reply::Error),
    #[error("failed to terminate session")]
    Quit(#[source] reply::Error),
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// PLAIN if offered, otherwise LOGIN.
fn choose_mechanism(offered: Auth) -> Option<MechanismKind> {
    [MechanismKind::Plain, MechanismKind::Login]
        .into_iter()
        .find(|&kind| offered.supports(kind))
}

/// Send `mail` according to `options`, echoing the conversation to `trace`
/// if given.
///
/// The connection is closed on every path; `QUIT` is only sent after the
/// message was accepted.
///
/// # Errors
///
/// The first step that failed, see [`Error`].
#[instrument(skip_all, fields(host = %options.host, port = options.port, mode = %options.mode))]
pub async fn send(
    options: &Options,
    mail: Mail<'_>,
    trace: Option<Sink>,
) -> Result<Outcome, Error> {
    let address = format!("{}:{}", options.host, options.port);
    let connector = TlsConnector::from(tls::client_config(options.insecure));
    let server_name = || {
        tls::server_name(&options.host).map_err(|e| Error::ServerName(options.host.clone(), e))
    };

    let tcp = deadline(options.timeout, TcpStream::connect(&address))
        .await
        .map_err(|source| Error::Connect {
            address: address.clone(),
            source,
        })?;
    info!(%address, "connected");

    let stream: MaybeTls<ClientTlsStream<TcpStream>, TcpStream> =
        if options.mode.is_implicit_tls() {
            let tls = deadline(options.timeout, connector.connect(server_name()?, tcp))
                .await
                .map_err(|e| Error::Tls(e.into()))?;
            info!("TLS handshake complete");
            MaybeTls::tls(tls)
        } else {
            MaybeTls::plain(tcp)
        };

    let mut client = Client::new(stream, trace).with_timeout(options.timeout);
    client.greeting().await.map_err(Error::Greeting)?;
    client.hello(&options.helo).await.map_err(Error::Hello)?;

    let mut mode = options.mode;

    if mode == Mode::StartTls {
        if client.supports(Extensions::STARTTLS) {
            client
                .starttls(&connector, server_name()?)
                .await
                .map_err(Error::Tls)?;
            info!("STARTTLS negotiation successful");
            client.hello(&options.helo).await.map_err(Error::Hello)?;
        } else {
            warn!("server does not advertise STARTTLS, continuing in plaintext");
            mode = Mode::Plaintext;
        }
    }

    if let Some(credentials) = &options.credentials {
        authenticate(&mut client, credentials, &options.host)
            .await
            .map_err(Error::Auth)?;
    }

    client.mail(mail.from).await.map_err(Error::Sender)?;

    for recipient in mail.to {
        client
            .rcpt(recipient)
            .await
            .map_err(|source| Error::Recipient {
                recipient: recipient.clone(),
                source,
            })?;
    }

    client.data().await.map_err(Error::DataOpen)?;
    client
        .write_message(mail.body)
        .await
        .map_err(Error::DataWrite)?;
    let reply = client.end_data().await.map_err(Error::DataClose)?;
    info!(%reply, "message accepted");

    client.quit().await.map_err(Error::Quit)?;

    Ok(Outcome { mode, reply })
}

async fn authenticate(
    client: &mut Client<TcpStream>,
    credentials: &Credentials,
    host: &str,
) -> Result<(), AuthError> {
    if !client.is_tls() && !is_loopback(host) {
        return Err(AuthError::Unencrypted);
    }

    let offered = client
        .ehlo_response()
        .map(|ehlo| ehlo.auth)
        .unwrap_or_else(Auth::empty);

    if offered.is_empty() {
        return Err(AuthError::Unsupported);
    }

    let kind = choose_mechanism(offered).ok_or(AuthError::NoMechanism)?;
    info!(mechanism = %kind, "authenticating");

    client
        .authenticate(&mut Authenticator::new(kind, credentials))
        .await
}
