//! A minimal plaintext [RFC 5322](https://datatracker.ietf.org/doc/html/rfc5322)
//! message.

use chrono::{DateTime, FixedOffset, Local};

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Headers are written in insertion order. Header values are written as
/// given, without encoding or folding, so they must be header-safe.
///
/// ```
/// # use smtp::message::Message;
/// let mut message = Message::new("Hello", "Hi there!");
/// message
///     .from("alice@example.com")
///     .to(["bob@example.com", "carol@example.com"])
///     .header("X-Mailer", "SMTP TLS Test");
///
/// assert_eq!(message.get("To"), Some("bob@example.com, carol@example.com"));
/// assert!(message.to_bytes().ends_with(b"\r\n\r\nHi there!"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Vec<(String, String)>,
    body: String,
}

impl Message {
    /// A message dated now.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::dated(subject, body, Local::now().into())
    }

    pub fn dated(
        subject: impl Into<String>,
        body: impl Into<String>,
        date: DateTime<FixedOffset>,
    ) -> Self {
        let mut message = Self {
            headers: Vec::new(),
            body: body.into(),
        };

        message
            .header("Subject", subject)
            .header("MIME-Version", "1.0")
            .header("Content-Type", "text/plain; charset=UTF-8")
            .header("Date", date.format(DATE_FORMAT).to_string());

        message
    }

    pub fn from(&mut self, address: impl Into<String>) -> &mut Self {
        self.header("From", address)
    }

    pub fn to<I, S>(&mut self, recipients: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let to = recipients
            .into_iter()
            .map(|r| r.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(", ");
        self.header("To", to)
    }

    /// Set a header, replacing the value of an existing header with the
    /// same (case-insensitive) name in place.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name, value)),
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Headers, a blank line, then the body verbatim.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        for (name, value) in &self.headers {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(self.body.as_bytes());
        buf
    }
}
