//! The JSON configuration file.
//!
//! ```json
//! {
//!   "smtp": {
//!     "host": "smtp.example.com",
//!     "port": 587,
//!     "from": "sender@example.com",
//!     "password": "your_password",
//!     "to": ["recipient@example.com"]
//!   }
//! }
//! ```

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use auth::Credentials;
use serde::{Deserialize, Serialize};
use smtp::{address, Mode, Options};
use tracing::info;

pub const DEFAULT_PATH: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid JSON in config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to create directory {}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write config file {}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode config")]
    Encode(#[source] serde_json::Error),
    #[error("invalid sender email")]
    Sender(#[source] address::Error),
    #[error("invalid recipient email(s)")]
    Recipients(#[source] address::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    pub smtp: SmtpConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Login name, the sender address if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub from: String,
    /// Empty to skip authentication.
    #[serde(default)]
    pub password: String,
    pub to: Vec<String>,
    /// Name announced with `EHLO`.
    #[serde(default = "default_helo")]
    pub helo: String,
    /// Accept any server certificate.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_helo() -> String {
    "localhost".to_owned()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.example.com".to_owned(),
            port: 587,
            username: None,
            from: "sender@example.com".to_owned(),
            password: "your_password".to_owned(),
            to: vec!["recipient@example.com".to_owned()],
            helo: default_helo(),
            insecure: false,
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .field("password", &"********")
            .field("to", &self.to)
            .field("helo", &self.helo)
            .field("insecure", &self.insecure)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SmtpConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.from)
    }

    /// `None` when there is no password.
    pub fn credentials(&self) -> Option<Credentials> {
        (!self.password.is_empty())
            .then(|| Credentials::new(self.username(), self.password.as_str()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Connection options, with the command line overrides applied.
    pub fn send_options(&self, force_tls: bool, insecure: bool) -> Options {
        Options {
            helo: self.helo.clone(),
            insecure: insecure || self.insecure,
            timeout: self.timeout(),
            credentials: self.credentials(),
            ..Options::new(&self.host, self.port, Mode::select(self.port, force_tls))
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;

        serde_json::from_slice(&data).map_err(|source| Error::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Any other error from [`Config::load`].
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        match Self::load(path) {
            Err(e) if e.is_not_found() => {
                info!("Config file not found, using default values");
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Write the default configuration to `path`, creating its directory.
    ///
    /// # Errors
    ///
    /// Fails if the directory or the file cannot be written.
    pub fn create_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
                path: dir.to_owned(),
                source,
            })?;
        }

        let config = Self::default();
        let data = serde_json::to_vec_pretty(&config).map_err(Error::Encode)?;

        fs::write(path, data).map_err(|source| Error::Write {
            path: path.to_owned(),
            source,
        })?;

        Ok(config)
    }

    /// Check the sender and every recipient.
    ///
    /// # Errors
    ///
    /// The first invalid address.
    pub fn validate(&self) -> Result<(), Error> {
        address::validate(&self.smtp.from).map_err(Error::Sender)?;
        address::validate_all(&self.smtp.to).map_err(Error::Recipients)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use smtp::{address, Mode};

    use super::{Config, Error, SmtpConfig};

    fn write(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(
            &dir,
            r#"{"smtp": {
                "host": "mail.example.org",
                "port": 465,
                "from": "me@example.org",
                "password": "secret",
                "to": ["you@example.org", "them@example.org"]
            }}"#,
        );

        let config = Config::load(&path)?;
        assert_eq!(config.smtp.host, "mail.example.org");
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.to.len(), 2);
        assert_eq!(config.smtp.username(), "me@example.org");
        assert_eq!(config.smtp.helo, "localhost");
        assert!(!config.smtp.insecure);
        assert_eq!(config.smtp.timeout(), None);

        Ok(())
    }

    #[test]
    fn optional_keys() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(
            &dir,
            r#"{"smtp": {
                "host": "localhost",
                "port": 2525,
                "username": "login",
                "from": "me@example.org",
                "password": "",
                "to": ["you@example.org"],
                "helo": "client.example.org",
                "insecure": true,
                "timeout_secs": 5
            }}"#,
        );

        let config = Config::load(&path)?;
        assert_eq!(config.smtp.username(), "login");
        assert!(config.smtp.credentials().is_none());

        let options = config.smtp.send_options(false, false);
        assert_eq!(options.mode, Mode::StartTls);
        assert_eq!(options.helo, "client.example.org");
        assert!(options.insecure);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));

        Ok(())
    }

    #[test]
    fn missing_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nope.json");

        assert!(Config::load(&path).unwrap_err().is_not_found());
        assert_eq!(Config::load_or_default(&path)?, Config::default());

        Ok(())
    }

    #[test]
    fn malformed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, r#"{"smtp": {"host": "x""#);

        assert!(matches!(Config::load(&path), Err(Error::Parse { .. })));
        assert!(matches!(
            Config::load_or_default(&path),
            Err(Error::Parse { .. })
        ));

        Ok(())
    }

    #[test]
    fn create_default() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("dir").join("config.json");

        let created = Config::create_default(&path)?;
        assert_eq!(Config::load(&path)?, created);
        assert_eq!(created.smtp.port, 587);

        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("\n  \"smtp\": {"), "{text}");

        Ok(())
    }

    #[test]
    fn validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.smtp.to.clear();
        assert!(matches!(
            config.validate(),
            Err(Error::Recipients(address::Error::EmptyList))
        ));

        config.smtp.to = vec!["ok@example.com".to_owned(), "broken".to_owned()];
        assert!(matches!(
            config.validate(),
            Err(Error::Recipients(address::Error::InvalidFormat(a))) if a == "broken"
        ));

        config.smtp.from = String::new();
        assert!(matches!(
            config.validate(),
            Err(Error::Sender(address::Error::Empty))
        ));
    }

    #[test]
    fn credentials() {
        let config = SmtpConfig::default();
        let credentials = config.credentials().unwrap();

        assert_eq!(credentials.username, "sender@example.com");
        assert_eq!(credentials.password.expose_secret(), "your_password");
    }

    #[test]
    fn tls_override() {
        let config = SmtpConfig {
            port: 587,
            ..SmtpConfig::default()
        };

        assert_eq!(config.send_options(false, false).mode, Mode::StartTls);
        assert_eq!(config.send_options(true, false).mode, Mode::ImplicitTls);
        assert!(config.send_options(false, true).insecure);
    }

    #[test]
    fn password_redacted() {
        let debug = format!("{:?}", Config::default());
        assert!(!debug.contains("your_password"));
        assert!(debug.contains("********"));
    }
}
