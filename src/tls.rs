//! TLS bootstrap (§6, SPEC_FULL §4): builds the single `rustls::ServerConfig`
//! shared by every implicit-TLS and STARTTLS-upgraded connection.

use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig as RustlsServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::config::CertSource;
use crate::error::{NntpError, Result};

/// Build a [`TlsAcceptor`] from the configured certificate source: either a
/// PEM pair loaded from disk, or a self-signed certificate generated fresh
/// at startup (§6: "generated self-signed on startup"). "Loaded by
/// thumbprint from the host's certificate store" has no cross-platform
/// equivalent in this crate's ecosystem and is not implemented (DESIGN.md).
pub fn build_acceptor(source: &CertSource) -> Result<TlsAcceptor> {
    let (cert_chain, key) = match source {
        CertSource::Pem { cert_path, key_path } => load_pem(cert_path, key_path)?,
        CertSource::SelfSigned { subject } => generate_self_signed(subject)?,
    };

    let config = RustlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(|e| NntpError::Tls(format!("building TLS server config: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_pem(
    cert_path: &std::path::Path,
    key_path: &std::path::Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let cert_bytes = std::fs::read(cert_path)
        .map_err(|e| NntpError::Tls(format!("reading certificate {cert_path:?}: {e}")))?;
    let key_bytes = std::fs::read(key_path)
        .map_err(|e| NntpError::Tls(format!("reading private key {key_path:?}: {e}")))?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_bytes.as_slice())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| NntpError::Tls(format!("parsing certificate PEM: {e}")))?;
    if certs.is_empty() {
        return Err(NntpError::Tls("no certificates found in PEM file".to_string()));
    }

    let key = rustls_pemfile::private_key(&mut key_bytes.as_slice())
        .map_err(|e| NntpError::Tls(format!("parsing private key PEM: {e}")))?
        .ok_or_else(|| NntpError::Tls("no private key found in PEM file".to_string()))?;

    Ok((certs, key))
}

fn generate_self_signed(
    subject: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed([subject.to_string()])
            .map_err(|e| NntpError::Tls(format!("generating self-signed certificate: {e}")))?;

    let cert_der = CertificateDer::from(cert.der().to_vec());
    let key_der = PrivateKeyDer::try_from(signing_key.serialize_der())
        .map_err(|e| NntpError::Tls(format!("encoding self-signed private key: {e}")))?;

    Ok((vec![cert_der], key_der))
}
