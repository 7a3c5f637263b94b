use std::{future::Future, io, time::Duration};

use auth::sasl::{Mechanism, MechanismError};
use base64::Engine;
use line::{
    stream::{ClientTlsStream, MaybeTls},
    trace::Sink,
    Connection,
};
use rustls::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};

use crate::{
    command::Command,
    data,
    ehlo::{self, Extensions},
    reply::{self, Reply},
};

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("server does not support AUTH")]
    Unsupported,
    #[error("none of the offered AUTH mechanisms are supported")]
    NoMechanism,
    #[error("refusing to send credentials over an unencrypted connection")]
    Unencrypted,
    #[error("invalid base64 in server challenge")]
    Decode,
    #[error(transparent)]
    Mechanism(#[from] MechanismError),
    #[error(transparent)]
    Reply(#[from] reply::Error),
}

/// Await `future`, giving up after `limit` if there is one.
pub(crate) async fn deadline<T, E: From<io::Error>>(
    limit: Option<Duration>,
    future: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .unwrap_or_else(|_| Err(io::Error::from(io::ErrorKind::TimedOut).into())),
        None => future.await,
    }
}

/// Client side of an SMTP session.
///
/// Every method sends one command and waits for its reply; nothing is
/// pipelined. Dropping the client closes the connection.
pub struct Client<IO: AsyncRead + AsyncWrite + Unpin> {
    connection: Connection<ClientTlsStream<IO>, IO>,
    ehlo: Option<ehlo::Response>,
    timeout: Option<Duration>,
}

impl<IO: AsyncRead + AsyncWrite + Unpin> Client<IO> {
    /// Wrap a connected stream. The server greeting has not been read yet,
    /// see [`Client::greeting`].
    pub fn new(stream: MaybeTls<ClientTlsStream<IO>, IO>, trace: Option<Sink>) -> Self {
        Self {
            connection: Connection::traced(stream, trace),
            ehlo: None,
            timeout: None,
        }
    }

    /// Limit how long to wait for each reply.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_tls(&self) -> bool {
        self.connection.is_tls()
    }

    /// What the server advertised in its last `EHLO` response.
    pub fn ehlo_response(&self) -> Option<&ehlo::Response> {
        self.ehlo.as_ref()
    }

    pub fn supports(&self, extensions: Extensions) -> bool {
        self.ehlo
            .as_ref()
            .is_some_and(|ehlo| ehlo.extensions.contains(extensions))
    }

    pub async fn read_reply(&mut self) -> Result<Reply, reply::Error> {
        deadline(self.timeout, Reply::read(self.connection.stream_mut())).await
    }

    /// Send a command and read the reply, whatever its code.
    pub async fn command(&mut self, command: &Command<'_>) -> Result<Reply, reply::Error> {
        self.connection.write_flush(command.to_string()).await?;
        self.read_reply().await
    }

    /// Read the `220` greeting.
    pub async fn greeting(&mut self) -> Result<Reply, reply::Error> {
        self.read_reply().await?.expect(220)
    }

    /// Say `EHLO`, falling back to `HELO` if the server does not know
    /// `EHLO`.
    #[instrument(skip(self))]
    pub async fn hello(&mut self, domain: &str) -> Result<&ehlo::Response, reply::Error> {
        let reply = self.command(&Command::Ehlo { domain }).await?;

        let response = if reply.is_permanent_failure() {
            debug!(%reply, "EHLO refused, trying HELO");
            let reply = self.command(&Command::Helo { domain }).await?.expect(250)?;
            let message = reply.message();
            ehlo::Response::helo(message.split(' ').next().unwrap_or_default())
        } else {
            ehlo::Response::try_from(reply)?
        };

        debug!(?response, "server hello");
        Ok(self.ehlo.insert(response))
    }

    /// Upgrade the session with `STARTTLS`.
    ///
    /// The server forgets everything about the session, so `EHLO` has to
    /// be sent again afterwards.
    #[instrument(skip_all)]
    pub async fn starttls(
        &mut self,
        connector: &TlsConnector,
        domain: ServerName,
    ) -> Result<(), reply::Error> {
        self.command(&Command::Starttls).await?.expect(220)?;
        deadline(self.timeout, self.connection.upgrade((domain, connector))).await?;
        self.ehlo = None;
        Ok(())
    }

    /// Run a SASL exchange.
    #[instrument(skip_all, fields(mechanism = %mechanism.kind()))]
    pub async fn authenticate(&mut self, mechanism: &mut impl Mechanism) -> Result<(), AuthError> {
        let initial_response = mechanism
            .initial_response()
            .map(|response| BASE64.encode(response));

        let mut reply = self
            .command(&Command::Auth {
                mechanism: mechanism.kind(),
                initial_response: initial_response.as_deref(),
            })
            .await?;

        loop {
            match reply.code() {
                235 => return Ok(()),
                334 => {
                    let challenge = BASE64
                        .decode(reply.message().trim())
                        .map_err(|_| AuthError::Decode)?;
                    let response = BASE64.encode(mechanism.respond(&challenge)?);

                    self.connection
                        .write_flush(format!("{response}\r\n"))
                        .await
                        .map_err(reply::Error::from)?;
                    reply = self.read_reply().await?;
                }
                _ => return Err(reply::Error::Rejected(reply).into()),
            }
        }
    }

    pub async fn mail(&mut self, from: &str) -> Result<Reply, reply::Error> {
        self.command(&Command::Mail { from }).await?.expect(250)
    }

    /// `250` or `251` (forwarding) are both fine.
    pub async fn rcpt(&mut self, to: &str) -> Result<Reply, reply::Error> {
        let reply = self.command(&Command::Rcpt { to }).await?;

        match reply.code() {
            250 | 251 => Ok(reply),
            _ => Err(reply::Error::Rejected(reply)),
        }
    }

    /// Open the data channel.
    pub async fn data(&mut self) -> Result<Reply, reply::Error> {
        self.command(&Command::Data).await?.expect(354)
    }

    /// Write the message, dot-stuffed. Must follow [`Client::data`].
    pub async fn write_message(&mut self, message: &[u8]) -> io::Result<()> {
        self.connection.write(data::encode(message)).await
    }

    /// Close the data channel; the server's reply says whether it took the
    /// message.
    pub async fn end_data(&mut self) -> Result<Reply, reply::Error> {
        self.connection.write_flush(data::TERMINATOR).await?;
        self.read_reply().await?.expect(250)
    }

    /// End the session and close the connection.
    pub async fn quit(mut self) -> Result<Reply, reply::Error> {
        let reply = self.command(&Command::Quit).await?.expect(221)?;

        // the server may already have hung up
        if let Err(e) = self.connection.shutdown().await {
            debug!(%e, "shutdown after QUIT failed");
        }

        Ok(reply)
    }
}
