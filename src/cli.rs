use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{config::DEFAULT_PATH, transport::Backend};

/// Test SMTP servers with different TLS configurations
#[derive(Parser, Debug)]
#[command(name = "smtp-tls-test", version)]
#[command(
    long_about = "Send a test email to an SMTP server over implicit TLS or STARTTLS.\n\
                  Port 465 uses implicit TLS, every other port STARTTLS when the server \
                  offers it. Use --verbose to watch the SMTP conversation."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    /// Defaults to `send`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct Global {
    /// Force implicit TLS for the SMTP connection
    #[arg(short, long, global = true)]
    pub tls: bool,

    /// Log the SMTP conversation
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = DEFAULT_PATH)]
    pub config: PathBuf,

    /// Accept any server certificate
    #[arg(short = 'k', long, global = true)]
    pub insecure: bool,

    /// How to talk to the server
    #[arg(long, global = true, value_enum, default_value_t = Backend::Native)]
    pub backend: Backend,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Send a test email
    Send,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print version information
    Version,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Create a default configuration file
    Create,
    /// Check that the configuration file is valid
    Validate,
    /// Show the current configuration
    Show,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, ConfigAction};
    use crate::transport::Backend;

    #[test]
    fn verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["smtp-tls-test"])?;

        assert!(cli.command.is_none());
        assert!(!cli.global.tls);
        assert!(!cli.global.verbose);
        assert!(!cli.global.insecure);
        assert_eq!(cli.global.config.to_str(), Some("config.json"));
        assert_eq!(cli.global.backend, Backend::Native);

        Ok(())
    }

    #[test]
    fn global_flags_after_subcommand() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "smtp-tls-test",
            "config",
            "show",
            "-v",
            "-c",
            "/etc/smtp.json",
        ])?;

        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
        assert!(cli.global.verbose);
        assert_eq!(cli.global.config.to_str(), Some("/etc/smtp.json"));

        Ok(())
    }

    #[test]
    fn send_flags() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["smtp-tls-test", "-tk", "send", "--backend", "lettre"])?;

        assert!(matches!(cli.command, Some(Command::Send)));
        assert!(cli.global.tls);
        assert!(cli.global.insecure);
        assert_eq!(cli.global.backend, Backend::Lettre);

        Ok(())
    }
}
