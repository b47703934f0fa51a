//! Builds a [`tokio_rustls::TlsAcceptor`] from a certificate/key pair on
//! disk, for gateways configured with `[ssl] cert_file` / `key_file`.

use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::config::ConfigError;

/// Loads a PEM certificate chain and private key and builds a
/// [`TlsAcceptor`] for accepting TLS syslog connections.
pub fn load_acceptor(cert_file: &Path, key_file: &Path) -> Result<TlsAcceptor, ConfigError> {
    let certs = load_certs(cert_file)?;
    let key = load_key(key_file)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ConfigError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|_| ConfigError::Missing(path.to_path_buf()))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::Tls(format!("failed to parse {}: {e}", path.display())))
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|_| ConfigError::Missing(path.to_path_buf()))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ConfigError::Tls(format!("failed to parse {}: {e}", path.display())))?
        .ok_or_else(|| ConfigError::Tls(format!("no private key found in {}", path.display())))
}
