use std::fmt;

/// Port on which servers expect a TLS handshake before any SMTP
/// ([RFC 8314](https://datatracker.ietf.org/doc/html/rfc8314#section-3.3)).
pub const SUBMISSIONS_PORT: u16 = 465;

/// How the session is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// TLS handshake right after connecting.
    ImplicitTls,
    /// Plaintext greeting, upgraded with `STARTTLS` if the server offers it.
    StartTls,
    /// No TLS at all.
    Plaintext,
}

impl Mode {
    /// Implicit TLS when forced or on the submissions port, otherwise try
    /// `STARTTLS`.
    ///
    /// ```
    /// # use smtp::Mode;
    /// assert_eq!(Mode::select(465, false), Mode::ImplicitTls);
    /// assert_eq!(Mode::select(587, false), Mode::StartTls);
    /// assert_eq!(Mode::select(25, true), Mode::ImplicitTls);
    /// ```
    pub const fn select(port: u16, force_tls: bool) -> Self {
        if force_tls || port == SUBMISSIONS_PORT {
            Self::ImplicitTls
        } else {
            Self::StartTls
        }
    }

    pub const fn is_implicit_tls(self) -> bool {
        matches!(self, Self::ImplicitTls)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ImplicitTls => "implicit TLS",
            Self::StartTls => "STARTTLS",
            Self::Plaintext => "plaintext",
        })
    }
}
