//! The two ways of delivering the test message.

use async_trait::async_trait;
use lettre::{
    address::{AddressError, Envelope},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        extension::ClientId,
        SmtpTransport,
    },
    Address, Transport as _,
};
use line::trace::Sink;
use secrecy::ExposeSecret;
use smtp::{Mail, Mode, Options};
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// The built-in client, which can trace the conversation.
    #[default]
    Native,
    /// lettre's SMTP transport.
    Lettre,
}

/// What the server said when it accepted the message.
#[derive(Debug)]
pub struct Receipt {
    pub mode: Mode,
    pub reply: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Native(#[from] smtp::send::Error),
    #[error(transparent)]
    Lettre(#[from] lettre::transport::smtp::Error),
    #[error("invalid address")]
    Address(#[from] AddressError),
    #[error("invalid envelope")]
    Envelope(#[from] lettre::error::Error),
    #[error("mail task failed")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait Transport {
    /// Whether the raw conversation can be echoed.
    fn traces_conversation(&self) -> bool;

    async fn send(&self, mail: Mail<'_>) -> Result<Receipt, Error>;
}

pub fn build(
    backend: Backend,
    options: Options,
    verbose: bool,
) -> Box<dyn Transport + Send + Sync> {
    match backend {
        Backend::Native => Box::new(Native { options, verbose }),
        Backend::Lettre => Box::new(Lettre { options }),
    }
}

pub struct Native {
    options: Options,
    verbose: bool,
}

#[async_trait]
impl Transport for Native {
    fn traces_conversation(&self) -> bool {
        true
    }

    async fn send(&self, mail: Mail<'_>) -> Result<Receipt, Error> {
        let trace = self
            .verbose
            .then(|| Box::new(std::io::stderr()) as Sink);
        let outcome = smtp::send(&self.options, mail, trace).await?;

        Ok(Receipt {
            mode: outcome.mode,
            reply: outcome.reply.to_string(),
        })
    }
}

pub struct Lettre {
    options: Options,
}

impl Lettre {
    fn transport(options: &Options) -> Result<SmtpTransport, Error> {
        let tls = match options.mode {
            Mode::Plaintext => Tls::None,
            mode => {
                let parameters = TlsParameters::builder(options.host.clone())
                    .dangerous_accept_invalid_certs(options.insecure)
                    .build_rustls()?;

                if options.insecure {
                    warn!(
                        "TLS certificate verification is DISABLED, the server is not authenticated"
                    );
                }

                if mode.is_implicit_tls() {
                    Tls::Wrapper(parameters)
                } else {
                    Tls::Opportunistic(parameters)
                }
            }
        };

        let mut builder = SmtpTransport::builder_dangerous(&options.host)
            .port(options.port)
            .tls(tls)
            .hello_name(ClientId::Domain(options.helo.clone()))
            .timeout(options.timeout);

        if let Some(credentials) = &options.credentials {
            builder = builder.credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.expose_secret().clone(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl Transport for Lettre {
    fn traces_conversation(&self) -> bool {
        false
    }

    #[instrument(skip_all, fields(host = %self.options.host, port = self.options.port))]
    async fn send(&self, mail: Mail<'_>) -> Result<Receipt, Error> {
        let from = mail.from.parse::<Address>()?;
        let to = mail
            .to
            .iter()
            .map(|to| to.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()?;
        let envelope = Envelope::new(Some(from), to)?;

        let transport = Self::transport(&self.options)?;
        let body = mail.body.to_vec();

        // lettre's SmtpTransport blocks
        let response =
            tokio::task::spawn_blocking(move || transport.send_raw(&envelope, &body)).await??;

        Ok(Receipt {
            mode: self.options.mode,
            reply: format!(
                "{} {}",
                response.code(),
                response.message().collect::<Vec<_>>().join(" ")
            ),
        })
    }
}
