use anyhow::Context;
use chrono::Local;
use smtp::{Mail, Message, Mode};
use tracing::{info, warn};

use crate::{
    cli::Global,
    config::{Config, SmtpConfig},
    logger, transport,
};

pub const SUBJECT: &str = "Test Email from SMTP TLS Test";
pub const BODY: &str = "This is a test email sent by SMTP TLS Test.";

/// The test message as sent.
pub fn message(smtp: &SmtpConfig) -> Message {
    let mut message = Message::new(SUBJECT, BODY);
    message
        .from(&smtp.from)
        .to(&smtp.to)
        .header("X-Mailer", "SMTP TLS Test");
    message
}

/// Load the configuration, check the addresses and send the test message.
/// Nothing touches the network before the addresses have been checked.
///
/// # Errors
///
/// Fails on configuration errors and if the message was not accepted.
pub async fn run(global: &Global) -> anyhow::Result<()> {
    let config = Config::load_or_default(&global.config).context("Failed to load config")?;
    config.validate()?;

    let smtp = &config.smtp;
    let options = smtp.send_options(global.tls, global.insecure);
    let transport = transport::build(global.backend, options.clone(), global.verbose);

    if global.verbose {
        logger::conversation_banner(
            &mut std::io::stderr(),
            Local::now().into(),
            &smtp.host,
            smtp.port,
            &smtp.from,
            &smtp.to,
        )?;

        if !transport.traces_conversation() {
            warn!("the {:?} backend cannot trace the conversation", global.backend);
        }
    }

    match options.mode {
        Mode::ImplicitTls => info!(
            "Sending email with direct TLS connection (port {})...",
            smtp.port
        ),
        _ => info!(
            "Sending email with STARTTLS if supported (port {})...",
            smtp.port
        ),
    }

    let body = message(smtp).to_bytes();
    let receipt = transport
        .send(Mail {
            from: &smtp.from,
            to: &smtp.to,
            body: &body,
        })
        .await
        .context("Failed to send email")?;

    info!(mode = %receipt.mode, reply = %receipt.reply, "delivered");
    println!("Email sent successfully!");

    Ok(())
}
