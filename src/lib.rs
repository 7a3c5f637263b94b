//! Send a single test email over implicit TLS or STARTTLS, optionally
//! tracing the SMTP conversation.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logger;
pub mod transport;
