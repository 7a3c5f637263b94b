use secrecy::ExposeSecret;

use crate::Credentials;

use super::{Mechanism, MechanismError, MechanismKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Username,
    Password,
    Done,
}

/// The non-standard but widespread LOGIN mechanism: the server prompts for
/// the username and then the password, one challenge each.
pub struct Login<'a> {
    credentials: &'a Credentials,
    step: Step,
}

impl<'a> Login<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            credentials,
            step: Step::Username,
        }
    }
}

impl Mechanism for Login<'_> {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Login
    }

    fn initial_response(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn respond(&mut self, _challenge: &[u8]) -> Result<Vec<u8>, MechanismError> {
        let (response, next) = match self.step {
            Step::Username => (self.credentials.username.as_bytes(), Step::Password),
            Step::Password => (
                self.credentials.password.expose_secret().as_bytes(),
                Step::Done,
            ),
            Step::Done => return Err(MechanismError::UnexpectedChallenge),
        };

        self.step = next;
        Ok(response.to_vec())
    }
}
