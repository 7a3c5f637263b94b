use secrecy::{ExposeSecret, SecretString};

use crate::Credentials;

use super::{Mechanism, MechanismError, MechanismKind};

#[derive(Debug)]
pub enum DecodeError {
    Utf8,
    MissingParts,
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(_: std::str::Utf8Error) -> Self {
        Self::Utf8
    }
}

impl From<DecodeError> for MechanismError {
    fn from(_: DecodeError) -> Self {
        Self::Decode
    }
}

/// Encode credentials as a PLAIN message with an empty authorization
/// identity ([RFC 4616](https://datatracker.ietf.org/doc/html/rfc4616)).
///
/// ```
/// # use auth::Credentials;
/// # use auth::sasl::plain::encode;
/// let credentials = Credentials::new("bob", "hunter2");
/// assert_eq!(encode(&credentials), b"\0bob\0hunter2");
/// ```
#[must_use]
pub fn encode(credentials: &Credentials) -> Vec<u8> {
    let password = credentials.password.expose_secret();
    let mut message = Vec::with_capacity(credentials.username.len() + password.len() + 2);
    message.push(0);
    message.extend_from_slice(credentials.username.as_bytes());
    message.push(0);
    message.extend_from_slice(password.as_bytes());
    message
}

/// Decode a PLAIN message, ignoring the authorization identity.
///
/// ```
/// # use auth::Credentials;
/// # use auth::sasl::plain::{decode, DecodeError};
/// # use secrecy::ExposeSecret;
/// let Credentials { username, password } = decode(b"\0bob\0hunter2")?;
/// assert_eq!(username, "bob");
/// assert_eq!(password.expose_secret(), "hunter2");
/// # Ok::<(), DecodeError>(())
/// ```
///
/// # Errors
///
/// Fails if the message is not UTF-8 or lacks the username or password.
pub fn decode(data: &[u8]) -> Result<Credentials, DecodeError> {
    let mut parts = std::str::from_utf8(data)?.splitn(3, '\0').skip(1);
    let username = parts.next().ok_or(DecodeError::MissingParts)?;
    let password = parts.next().ok_or(DecodeError::MissingParts)?;

    Ok(Credentials {
        username: username.to_owned(),
        password: SecretString::new(password.to_owned()),
    })
}

pub struct Plain<'a> {
    credentials: &'a Credentials,
    sent: bool,
}

impl<'a> Plain<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            credentials,
            sent: false,
        }
    }
}

impl Mechanism for Plain<'_> {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Plain
    }

    fn initial_response(&mut self) -> Option<Vec<u8>> {
        self.sent = true;
        Some(encode(self.credentials))
    }

    /// Answers a single empty challenge, for servers that want the
    /// credentials sent after `AUTH PLAIN` without an initial response.
    fn respond(&mut self, challenge: &[u8]) -> Result<Vec<u8>, MechanismError> {
        if self.sent || !challenge.is_empty() {
            return Err(MechanismError::UnexpectedChallenge);
        }

        self.sent = true;
        Ok(encode(self.credentials))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        sasl::{Mechanism, MechanismError},
        Credentials,
    };

    use super::Plain;

    #[test]
    fn initial_response() {
        let credentials = Credentials::new("alice@example.com", "pw");
        let mut plain = Plain::new(&credentials);

        assert_eq!(
            plain.initial_response().unwrap(),
            b"\0alice@example.com\0pw"
        );
        assert!(matches!(
            plain.respond(b"more?"),
            Err(MechanismError::UnexpectedChallenge)
        ));
    }

    #[test]
    fn empty_challenge() {
        let credentials = Credentials::new("bob", "hunter2");
        let mut plain = Plain::new(&credentials);

        assert_eq!(plain.respond(b"").unwrap(), b"\0bob\0hunter2");
        assert!(matches!(
            plain.respond(b""),
            Err(MechanismError::UnexpectedChallenge)
        ));
    }

    #[test]
    fn answers_once() {
        let credentials = Credentials::new("bob", "hunter2");
        let mut plain = Plain::new(&credentials);

        assert!(plain.initial_response().is_some());
        assert!(matches!(
            plain.respond(b""),
            Err(MechanismError::UnexpectedChallenge)
        ));
    }
}
