pub mod config;
pub mod send;
pub mod version;

use crate::cli::{Cli, Command};

/// Run the command line, `send` when no subcommand was given.
///
/// # Errors
///
/// Whatever the command failed with.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Send) {
        Command::Send => send::run(&cli.global).await,
        Command::Config { action } => config::run(action, &cli.global.config),
        Command::Version => Ok(version::print(&mut std::io::stdout())?),
    }
}
