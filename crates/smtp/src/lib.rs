//! SMTP client library: replies, commands, `EHLO` parsing, message
//! building and a sequential client session with `STARTTLS` and `AUTH`.

#![warn(clippy::pedantic)]

pub mod address;
pub mod client;
pub mod command;
pub mod data;
pub mod ehlo;
pub mod message;
pub mod mode;
pub mod reply;
pub mod send;
pub mod tls;

pub use client::Client;
pub use message::Message;
pub use mode::Mode;
pub use reply::Reply;
pub use send::{send, Mail, Options, Outcome};

/// The maximum number of bytes in a line including the CRLF.
pub const LINE_LIMIT: usize = 1000;
