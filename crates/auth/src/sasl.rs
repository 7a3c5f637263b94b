use std::fmt;

use crate::Credentials;

pub mod login;
pub mod plain;

pub use login::Login;
pub use plain::Plain;

/// SASL mechanisms this client can speak, in order of preference.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MechanismKind {
    Plain,
    Login,
}

impl MechanismKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

impl std::str::FromStr for MechanismKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Ok(Self::Plain),
            "LOGIN" => Ok(Self::Login),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MechanismError {
    #[error("unexpected challenge from server")]
    UnexpectedChallenge,
    #[error("decode error")]
    Decode,
}

/// The client half of a SASL exchange. Challenges and responses are raw
/// bytes; the transport takes care of any base64 framing.
pub trait Mechanism {
    fn kind(&self) -> MechanismKind;

    /// Response sent along with the initial command, if the mechanism has one.
    fn initial_response(&mut self) -> Option<Vec<u8>>;

    /// Answer a server challenge.
    ///
    /// # Errors
    ///
    /// Returns [`MechanismError::UnexpectedChallenge`] if the server keeps
    /// asking after the mechanism has nothing left to say.
    fn respond(&mut self, challenge: &[u8]) -> Result<Vec<u8>, MechanismError>;
}

pub enum Authenticator<'a> {
    Plain(Plain<'a>),
    Login(Login<'a>),
}

impl<'a> Authenticator<'a> {
    pub fn new(kind: MechanismKind, credentials: &'a Credentials) -> Self {
        match kind {
            MechanismKind::Plain => Self::Plain(Plain::new(credentials)),
            MechanismKind::Login => Self::Login(Login::new(credentials)),
        }
    }
}

impl Mechanism for Authenticator<'_> {
    fn kind(&self) -> MechanismKind {
        match self {
            Self::Plain(plain) => plain.kind(),
            Self::Login(login) => login.kind(),
        }
    }

    fn initial_response(&mut self) -> Option<Vec<u8>> {
        match self {
            Self::Plain(plain) => plain.initial_response(),
            Self::Login(login) => login.initial_response(),
        }
    }

    fn respond(&mut self, challenge: &[u8]) -> Result<Vec<u8>, MechanismError> {
        match self {
            Self::Plain(plain) => plain.respond(challenge),
            Self::Login(login) => login.respond(challenge),
        }
    }
}
