//! Syntax checks for mailbox addresses.
//!
//! Deliberately simple: `local@domain.tld` with an ASCII local part, an
//! ASCII domain and a TLD of at least two letters. Addresses are never
//! normalized.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("email cannot be empty")]
    Empty,
    #[error("invalid email format: {0:?}")]
    InvalidFormat(String),
    #[error("at least one email address is required")]
    EmptyList,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
            .expect("address pattern is valid")
    })
}

/// Check a single address. Surrounding whitespace is ignored.
///
/// # Errors
///
/// [`Error::Empty`] for an empty string, [`Error::InvalidFormat`] if the
/// address does not look like `local@domain.tld`.
pub fn validate(address: &str) -> Result<(), Error> {
    if address.is_empty() {
        return Err(Error::Empty);
    }

    if pattern().is_match(address.trim()) {
        Ok(())
    } else {
        Err(Error::InvalidFormat(address.to_owned()))
    }
}

/// Check every address in order, stopping at the first invalid one.
///
/// # Errors
///
/// [`Error::EmptyList`] if there are no addresses, otherwise the error of
/// the first invalid address.
pub fn validate_all<S: AsRef<str>>(addresses: &[S]) -> Result<(), Error> {
    if addresses.is_empty() {
        return Err(Error::EmptyList);
    }

    addresses
        .iter()
        .try_for_each(|address| validate(address.as_ref()))
}
