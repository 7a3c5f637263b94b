use std::fmt;

use auth::sasl::MechanismKind;

/// Commands sent by the client, formatted for the wire including CRLF.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Ehlo {
        domain: &'a str,
    },
    Helo {
        domain: &'a str,
    },
    Starttls,
    /// AUTH <mechanism> [initial-response]
    ///
    /// See [RFC 4954](https://datatracker.ietf.org/doc/html/rfc4954#section-4).
    Auth {
        mechanism: MechanismKind,
        /// Base64 encoded initial response to save a round-trip.
        initial_response: Option<&'a str>,
    },
    Mail {
        from: &'a str,
    },
    Rcpt {
        to: &'a str,
    },
    Data,
    Quit,
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ehlo { domain } => write!(f, "EHLO {domain}"),
            Self::Helo { domain } => write!(f, "HELO {domain}"),
            Self::Starttls => f.write_str("STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => write!(f, "AUTH {mechanism}"),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => write!(f, "AUTH {mechanism} {response}"),
            Self::Mail { from } => write!(f, "MAIL FROM:<{from}>"),
            Self::Rcpt { to } => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::Quit => f.write_str("QUIT"),
        }?;

        f.write_str("\r\n")
    }
}
