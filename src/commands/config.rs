use std::{
    io::{self, Write},
    path::Path,
};

use anyhow::Context;
use tracing::info;

use crate::{
    cli::ConfigAction,
    config::{Config, SmtpConfig},
};

/// # Errors
///
/// Fails if the file cannot be written, read or validated.
pub fn run(action: ConfigAction, path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Create => {
            Config::create_default(path).context("Failed to create config file")?;
            info!(path = %path.display(), "Default config file created successfully");
            println!("Default config file created at {}", path.display());
        }
        ConfigAction::Validate => {
            let config = Config::load(path).context("Failed to load config")?;
            config.validate()?;

            let mut out = io::stdout().lock();
            writeln!(out, "Configuration file is valid")?;
            summary(&mut out, &config.smtp)?;
        }
        ConfigAction::Show => {
            let config = Config::load(path).context("Failed to load config")?;

            let mut out = io::stdout().lock();
            writeln!(out, "Current Configuration:")?;
            summary(&mut out, &config.smtp)?;
            writeln!(out, "Username: {}", config.smtp.username())?;
            writeln!(out, "Password: ********")?;
        }
    }

    Ok(())
}

fn summary(out: &mut impl Write, smtp: &SmtpConfig) -> io::Result<()> {
    writeln!(out, "SMTP Host: {}", smtp.host)?;
    writeln!(out, "SMTP Port: {}", smtp.port)?;
    writeln!(out, "From: {}", smtp.from)?;
    writeln!(out, "To: {}", smtp.to.join(", "))
}
