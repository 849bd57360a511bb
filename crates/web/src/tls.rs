//! Certificate plumbing for both sides of the bootstrap flow.
//!
//! The local HTTPS listener serves a self-signed certificate that is
//! generated once and persisted next to the other resource files. The
//! outbound client configs come in two flavors: a verifying one backed
//! by the bundled webpki roots for DNS-over-HTTPS, and an insecure one
//! for the game server, which fronts its traffic with certificates the
//! client is expected to ignore.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::CertificateDer;
use tracing::{debug, info};

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

/// Load the persisted serving certificate, generating a fresh one when
/// either PEM file is missing.
pub(crate) async fn server_config(resource_dir: &Path) -> Result<RustlsConfig> {
    let cert_path = resource_dir.join(CERT_FILE);
    let key_path = resource_dir.join(KEY_FILE);

    if !cert_path.exists() || !key_path.exists() {
        generate_certificate(&cert_path, &key_path)?;
    }

    RustlsConfig::from_pem_file(&cert_path, &key_path)
        .await
        .with_context(|| format!("Failed to load TLS certificate from {}", cert_path.display()))
}

fn generate_certificate(cert_path: &Path, key_path: &Path) -> Result<()> {
    debug!("Generating self-signed certificate");

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .context("Failed to generate certificate")?;

    if let Some(parent) = cert_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    fs::write(cert_path, cert.cert.pem())
        .with_context(|| format!("Failed to write {}", cert_path.display()))?;
    fs::write(key_path, cert.key_pair.serialize_pem())
        .with_context(|| format!("Failed to write {}", key_path.display()))?;

    info!("Wrote self-signed certificate to {}", cert_path.display());
    Ok(())
}

/// Client config that verifies server certificates against the bundled
/// webpki roots.
pub(crate) fn verifying_client_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

/// Client config that accepts any server certificate.
pub(crate) fn insecure_client_config() -> rustls::ClientConfig {
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
        .with_no_client_auth()
}

/// Certificate verifier that accepts all certificates.
#[derive(Debug)]
struct SkipServerVerification;

impl rustls::client::danger::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
