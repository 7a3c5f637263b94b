use std::io::{self, Write};

use chrono::{DateTime, FixedOffset};
use smtp::message::DATE_FORMAT;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so that stdout only
/// carries results. `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: bool) {
    let default = if verbose {
        "info,smtp_tls_test=debug,smtp=debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

/// The block printed before a traced conversation.
///
/// # Errors
///
/// Any error writing to `out`.
pub fn conversation_banner(
    out: &mut impl Write,
    time: DateTime<FixedOffset>,
    host: &str,
    port: u16,
    from: &str,
    to: &[String],
) -> io::Result<()> {
    writeln!(out, "=== SMTP Conversation Log ===")?;
    writeln!(out, "Time: {}", time.format(DATE_FORMAT))?;
    writeln!(out, "Server: {host}:{port}")?;
    writeln!(out, "From: {from}")?;
    for (i, recipient) in to.iter().enumerate() {
        writeln!(out, "To[{i}]: {recipient}")?;
    }
    writeln!(out, "===========================")
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::conversation_banner;

    #[test]
    fn banner() -> anyhow::Result<()> {
        let time = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 4, 19, 12, 30, 0)
            .unwrap();

        let mut out = Vec::new();
        conversation_banner(
            &mut out,
            time,
            "smtp.example.com",
            587,
            "sender@example.com",
            &["a@example.com".to_owned(), "b@example.com".to_owned()],
        )?;

        assert_eq!(
            String::from_utf8(out)?,
            "=== SMTP Conversation Log ===\n\
             Time: Sat, 19 Apr 2025 12:30:00 +0200\n\
             Server: smtp.example.com:587\n\
             From: sender@example.com\n\
             To[0]: a@example.com\n\
             To[1]: b@example.com\n\
             ===========================\n"
        );

        Ok(())
    }
}
