//! Server-side TLS built on `rustls`.
//!
//! Certificates and keys are loaded once at startup; failures there are
//! fatal. The handshake itself runs on the worker that owns the connection,
//! so a slow or broken client never stalls the acceptor.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::TcpStream;
use std::sync::Arc;

use camino::Utf8Path;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};

use super::{ConnectionStream, TlsSetupError};

/// Wraps accepted sockets in server-side TLS sessions.
#[derive(Debug, Clone)]
pub struct TlsAcceptor {
    config: Arc<ServerConfig>,
}

impl TlsAcceptor {
    /// Builds an acceptor from a PEM certificate chain and a PEM private key.
    ///
    /// PKCS#8, PKCS#1 and SEC1 keys are accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`TlsSetupError`] when either file is unreadable, empty, or
    /// rejected by `rustls`.
    pub fn from_pem_files(cert_path: &Utf8Path, key_path: &Utf8Path) -> Result<Self, TlsSetupError> {
        let certs = load_certificates(cert_path)?;
        let key = load_private_key(key_path)?;
        let config = ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Performs the server handshake on `socket`.
    ///
    /// The socket's read and write timeouts bound the handshake.
    pub(crate) fn accept(&self, socket: TcpStream) -> io::Result<ConnectionStream> {
        let connection = ServerConnection::new(Arc::clone(&self.config)).map_err(io::Error::other)?;
        let mut stream = StreamOwned::new(connection, socket);
        while stream.conn.is_handshaking() {
            stream.conn.complete_io(&mut stream.sock)?;
        }
        Ok(ConnectionStream::Tls(Box::new(stream)))
    }
}

fn open(path: &Utf8Path) -> Result<BufReader<File>, TlsSetupError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsSetupError::Read {
            path: path.to_owned(),
            source,
        })
}

fn load_certificates(path: &Utf8Path) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsSetupError::Read {
            path: path.to_owned(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsSetupError::NoCertificates {
            path: path.to_owned(),
        });
    }
    Ok(certs)
}

fn load_private_key(path: &Utf8Path) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsSetupError::Read {
            path: path.to_owned(),
            source,
        })?
        .ok_or_else(|| TlsSetupError::NoPrivateKey {
            path: path.to_owned(),
        })
}
