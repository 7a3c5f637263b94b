use std::io::{self, Write};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set at build time through `SMTP_TLS_TEST_BUILD_DATE`.
pub const BUILD_DATE: &str = match option_env!("SMTP_TLS_TEST_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

/// Set at build time through `SMTP_TLS_TEST_GIT_COMMIT`.
pub const GIT_COMMIT: &str = match option_env!("SMTP_TLS_TEST_GIT_COMMIT") {
    Some(commit) => commit,
    None => "development",
};

/// # Errors
///
/// Any error writing to `out`.
pub fn print(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "SMTP TLS Test v{VERSION}")?;
    writeln!(out, "Build Date: {BUILD_DATE}")?;
    writeln!(out, "Git Commit: {GIT_COMMIT}")
}
