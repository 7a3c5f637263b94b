//! A scripted SMTP server for driving the client against real sockets.

use std::{
    io::Write,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use base64::Engine;
use line::{
    read_line, ReadLineError,
    stream::{MaybeTls, ServerTlsStream},
    Connection,
};
use rustls::{Certificate, PrivateKey, ServerConfig};
use secrecy::ExposeSecret;
use smtp::ehlo::{Auth, Extensions, Response};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;

/// How the server behaves.
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    /// Handshake before the greeting.
    pub implicit_tls: bool,
    pub starttls: bool,
    /// Keep advertising `STARTTLS` once the session is encrypted.
    pub starttls_over_tls: bool,
    /// Advertise `STARTTLS` but refuse it.
    pub refuse_starttls: bool,
    pub auth: Auth,
    /// Recipients answered with `550`.
    pub unknown_recipients: Vec<String>,
}

/// What the server saw.
#[derive(Debug, Default)]
pub struct Transcript {
    /// Command lines in order.
    pub commands: Vec<String>,
    /// `(username, password)` from `AUTH PLAIN`.
    pub credentials: Option<(String, String)>,
    /// The data lines, still dot-stuffed, without the terminator.
    pub data: Vec<String>,
    /// Whether the session was encrypted when `MAIL` arrived.
    pub tls_at_mail: bool,
}

impl Transcript {
    pub fn verbs(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| {
                command
                    .split([' ', ':'])
                    .next()
                    .unwrap_or_default()
                    .to_ascii_uppercase()
            })
            .collect()
    }
}

/// A trace sink that can be inspected afterwards.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn acceptor() -> anyhow::Result<TlsAcceptor> {
    let cert = rcgen::generate_simple_self_signed(["localhost".to_owned()])?;

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(
            vec![Certificate(cert.serialize_der()?)],
            PrivateKey(cert.serialize_private_key_der()),
        )?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

type ServerConnection = Connection<ServerTlsStream<TcpStream>, TcpStream>;

async fn reply(connection: &mut ServerConnection, reply: &str) -> std::io::Result<()> {
    connection.write_flush(reply).await
}

/// `None` once the client hung up.
async fn next_line(connection: &mut ServerConnection) -> anyhow::Result<Option<String>> {
    let mut buf = Vec::new();
    match read_line(connection.stream_mut(), &mut buf).await {
        Ok(()) => Ok(Some(String::from_utf8(buf)?)),
        Err(ReadLineError::Eof) => Ok(None),
        // TLS peers that hang up without close_notify
        Err(ReadLineError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(ReadLineError::Io(e)) => Err(e.into()),
    }
}

/// Serve a single session on a fresh port. The transcript ends with `QUIT`
/// or when the client hangs up.
pub async fn spawn(
    behavior: Behavior,
) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<Transcript>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let acceptor = acceptor()?;

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        let stream = if behavior.implicit_tls {
            MaybeTls::tls(acceptor.accept(socket).await?)
        } else {
            MaybeTls::plain(socket)
        };

        let mut connection = ServerConnection::new(stream);
        serve(&mut connection, &acceptor, &behavior).await
    });

    Ok((addr, handle))
}

async fn serve(
    connection: &mut ServerConnection,
    acceptor: &TlsAcceptor,
    behavior: &Behavior,
) -> anyhow::Result<Transcript> {
    let mut transcript = Transcript::default();

    reply(connection, "220 localhost ESMTP scripted\r\n").await?;

    loop {
        let Some(line) = next_line(connection).await? else {
            return Ok(transcript);
        };
        transcript.commands.push(line.clone());

        let (verb, args) = line.split_once(' ').unwrap_or((&line, ""));

        match verb.to_ascii_uppercase().as_str() {
            "EHLO" => {
                let mut extensions = Extensions::_8BITMIME;
                let offered = behavior.starttls || behavior.refuse_starttls;
                if offered && (connection.is_plain() || behavior.starttls_over_tls) {
                    extensions |= Extensions::STARTTLS;
                }

                let ehlo = Response {
                    domain: "localhost".to_owned(),
                    extensions,
                    size: None,
                    auth: behavior.auth,
                };
                reply(connection, &ehlo.to_string()).await?;
            }
            "STARTTLS" if behavior.refuse_starttls => {
                reply(connection, "454 4.7.0 TLS not available\r\n").await?;
            }
            "STARTTLS" => {
                reply(connection, "220 2.0.0 ready to start TLS\r\n").await?;
                connection.upgrade(acceptor).await?;
            }
            "AUTH" => {
                let encoded = args.strip_prefix("PLAIN ").unwrap_or_default();
                let decoded = base64::engine::general_purpose::STANDARD.decode(encoded)?;
                let credentials = auth::sasl::plain::decode(&decoded)
                    .map_err(|e| anyhow::anyhow!("bad PLAIN message: {e:?}"))?;

                transcript.credentials = Some((
                    credentials.username,
                    credentials.password.expose_secret().to_owned(),
                ));
                reply(connection, "235 2.7.0 authenticated\r\n").await?;
            }
            "MAIL" => {
                transcript.tls_at_mail = connection.is_tls();
                reply(connection, "250 2.1.0 ok\r\n").await?;
            }
            "RCPT" => {
                let recipient = args
                    .trim_start_matches("TO:<")
                    .trim_end_matches('>')
                    .to_owned();

                if behavior.unknown_recipients.contains(&recipient) {
                    reply(connection, "550 5.1.1 no such user\r\n").await?;
                } else {
                    reply(connection, "250 2.1.5 ok\r\n").await?;
                }
            }
            "DATA" => {
                reply(connection, "354 end data with <CR><LF>.<CR><LF>\r\n").await?;

                loop {
                    let line = next_line(connection)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("client hung up during DATA"))?;
                    if line == "." {
                        break;
                    }
                    transcript.data.push(line);
                }

                reply(connection, "250 2.0.0 queued as 42\r\n").await?;
            }
            "QUIT" => {
                reply(connection, "221 2.0.0 bye\r\n").await?;
                return Ok(transcript);
            }
            _ => reply(connection, "502 5.5.2 command not recognized\r\n").await?,
        }
    }
}
