//! [SMTP EHLO response](https://datatracker.ietf.org/doc/html/rfc5321#section-4.1.1.1)
//! parsing and formatting.
//!
//! Example EHLO exchange:
//!
//! ```txt
//! S: 220 mail.example.com
//! C: EHLO localhost
//! S: 250-mail.example.com
//! 250-PIPELINING
//! 250-SIZE 52428800
//! 250-ETRN
//! 250-AUTH PLAIN LOGIN
//! 250-ENHANCEDSTATUSCODES
//! 250-8BITMIME
//! 250-DSN
//! 250-CHUNKING
//! 250 STARTTLS
//! ```

use std::{borrow::Cow, fmt};

use auth::sasl::MechanismKind;
use bitflags::bitflags;

use crate::reply::{self, Reply};

/// SMTP EHLO response.
///
/// ```
/// # use smtp::ehlo::{Auth, Extensions, Response};
/// let ehlo = Response {
///     domain: "mail.example.com".to_owned(),
///     extensions: Extensions::STARTTLS,
///     size: Some(1024),
///     auth: Auth::PLAIN,
/// };
///
/// assert_eq!(
///     ehlo.to_string(),
///     "250-mail.example.com\r\n\
///     250-STARTTLS\r\n\
///     250-SIZE 1024\r\n\
///     250 AUTH PLAIN\r\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Domain name of the server.
    pub domain: String,
    /// SMTP extensions advertised.
    pub extensions: Extensions,
    /// Maximum message size in bytes
    /// ([RFC 1870](https://datatracker.ietf.org/doc/html/rfc1870)).
    pub size: Option<u64>,
    /// AUTH mechanisms supported.
    pub auth: Auth,
}

bitflags! {
    /// AUTH mechanisms advertised by the server.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Auth: u8 {
        const LOGIN = 1 << 0;
        const PLAIN = 1 << 1;
    }
}

bitflags! {
    /// SMTP extensions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Extensions: u8 {
        const _8BITMIME = 1 << 0;
        const SMTPUTF8 = 1 << 1;
        /// Message chunking per [RFC 3030](https://datatracker.ietf.org/doc/html/rfc3030).
        const CHUNKING = 1 << 2;
        /// Oppurtunistic TLS support using `STARTTLS`
        /// ([RFC 3207](https://datatracker.ietf.org/doc/html/rfc3207)).
        const STARTTLS = 1 << 3;
        const ENHANCEDSTATUSCODES = 1 << 4;
        const PIPELINING = 1 << 5;
    }
}

impl Extensions {
    const KEYWORDS: [(&'static str, Self); 6] = [
        ("8BITMIME", Self::_8BITMIME),
        ("SMTPUTF8", Self::SMTPUTF8),
        ("CHUNKING", Self::CHUNKING),
        ("STARTTLS", Self::STARTTLS),
        ("ENHANCEDSTATUSCODES", Self::ENHANCEDSTATUSCODES),
        ("PIPELINING", Self::PIPELINING),
    ];

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            .map(|&(_, flag)| flag)
    }

    /// Keywords of the extensions that are set.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::KEYWORDS
            .into_iter()
            .filter(move |&(_, flag)| self.contains(flag))
            .map(|(name, _)| name)
    }
}

impl Auth {
    pub fn from_mechanism(mechanism: MechanismKind) -> Self {
        match mechanism {
            MechanismKind::Login => Self::LOGIN,
            MechanismKind::Plain => Self::PLAIN,
        }
    }

    pub fn supports(self, mechanism: MechanismKind) -> bool {
        self.contains(Self::from_mechanism(mechanism))
    }

    /// Unknown mechanisms are silently ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(|name| name.parse().ok())
            .fold(Self::empty(), |auth, kind| auth | Self::from_mechanism(kind))
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        [MechanismKind::Login, MechanismKind::Plain]
            .into_iter()
            .filter(move |&kind| self.supports(kind))
            .map(MechanismKind::as_str)
    }
}

impl fmt::Display for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AUTH")?;
        for auth in self.names() {
            write!(f, " {auth}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = std::iter::once(Cow::Borrowed(self.domain.as_str()))
            .chain(self.extensions.names().map(|name| Cow::Borrowed(name)))
            .chain(self.size.map(|s| Cow::Owned(format!("SIZE {s}"))))
            .chain((!self.auth.is_empty()).then(|| self.auth.to_string().into()))
            .peekable();

        while let Some(ehlo_line) = lines.next() {
            if lines.peek().is_some() {
                write!(f, "250-{ehlo_line}\r\n")?;
            } else {
                write!(f, "250 {ehlo_line}\r\n")?;
            }
        }

        Ok(())
    }
}

impl Response {
    /// A server that only answered `HELO` advertises nothing.
    pub fn helo(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            extensions: Extensions::empty(),
            size: None,
            auth: Auth::empty(),
        }
    }
}

impl TryFrom<Reply> for Response {
    type Error = reply::Error;

    /// Interpret a `250` reply to `EHLO`. Unknown keywords are ignored.
    ///
    /// # Errors
    ///
    /// [`reply::Error::Rejected`] for any other reply code,
    /// [`reply::Error::Syntax`] if `SIZE` is not a number.
    fn try_from(reply: Reply) -> Result<Self, Self::Error> {
        let reply = reply.expect(250)?;
        let mut lines = reply.lines().iter().map(|line| line.trim_end());

        // the first line is the domain, optionally followed by a greeting
        let domain = lines
            .next()
            .and_then(|line| line.split(' ').next())
            .unwrap_or_default()
            .to_owned();

        let mut response = Self::helo(domain);

        for line in lines {
            let (keyword, args) = line.split_once([' ', '=']).unwrap_or((line, ""));

            if keyword.eq_ignore_ascii_case("SIZE") {
                // "SIZE" without a limit is allowed
                if !args.is_empty() {
                    response.size = Some(args.parse().map_err(|_| reply::Error::Syntax)?);
                }
            } else if keyword.eq_ignore_ascii_case("AUTH") {
                response.auth |= Auth::from_names(args.split(' '));
            } else if let Some(extension) = Extensions::from_keyword(keyword) {
                response.extensions |= extension;
            }
        }

        Ok(response)
    }
}
