//! Client TLS configuration.

use std::{sync::Arc, time::SystemTime};

use rustls::{
    client::{ServerCertVerified, ServerCertVerifier},
    Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName,
};
use tracing::warn;

pub use rustls::client::InvalidDnsNameError;

/// Build the client configuration.
///
/// With `insecure`, the server certificate is accepted without any
/// verification. Only meant for test servers with self-signed certificates.
pub fn client_config(insecure: bool) -> Arc<ClientConfig> {
    let builder = ClientConfig::builder().with_safe_defaults();

    let config = if insecure {
        warn!("TLS certificate verification is DISABLED, the server is not authenticated");
        builder
            .with_custom_certificate_verifier(Arc::new(NoVerification))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        builder
            .with_root_certificates(roots)
            .with_no_client_auth()
    };

    Arc::new(config)
}

/// The name used for SNI and certificate verification.
///
/// # Errors
///
/// Fails if `host` is neither a DNS name nor an IP address.
pub fn server_name(host: &str) -> Result<ServerName, InvalidDnsNameError> {
    ServerName::try_from(host)
}

struct NoVerification;

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

#[cfg(test)]
mod tests {
    use super::server_name;

    #[test]
    fn server_names() {
        assert!(server_name("smtp.example.com").is_ok());
        assert!(server_name("127.0.0.1").is_ok());
        assert!(server_name("not a host").is_err());
    }
}
