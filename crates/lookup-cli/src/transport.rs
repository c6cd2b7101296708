//! Plain and TLS connections to the daemon.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use super::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to reach the daemon.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) tls: Option<TlsTarget>,
}

#[derive(Debug, Clone)]
pub(crate) struct TlsTarget {
    pub(crate) ca_file: Utf8PathBuf,
    pub(crate) server_name: String,
}

impl Target {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) enum Connection {
    Tcp(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Connection {
    /// Sends a TLS close notification; plain connections need nothing.
    pub(crate) fn finish(&mut self) {
        if let Self::Tls(stream) = self {
            stream.conn.send_close_notify();
            // The daemon may already have closed its side.
            drop(stream.flush());
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

pub(crate) fn connect(target: &Target) -> Result<Connection, AppError> {
    let endpoint = target.endpoint();
    let address = resolve_tcp_address(&target.host, target.port).map_err(|source| {
        AppError::Resolve {
            endpoint: endpoint.clone(),
            source,
        }
    })?;
    let stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
        .and_then(|stream| {
            stream.set_read_timeout(Some(CONNECTION_TIMEOUT))?;
            stream.set_write_timeout(Some(CONNECTION_TIMEOUT))?;
            Ok(stream)
        })
        .map_err(|source| AppError::Connect { endpoint, source })?;

    let Some(tls) = &target.tls else {
        return Ok(Connection::Tcp(stream));
    };
    let config = client_config(&tls.ca_file)?;
    let name = ServerName::try_from(tls.server_name.clone()).map_err(|_| AppError::ServerName {
        name: tls.server_name.clone(),
    })?;
    let connection = ClientConnection::new(Arc::new(config), name)?;
    Ok(Connection::Tls(Box::new(StreamOwned::new(connection, stream))))
}

fn client_config(ca_file: &Utf8Path) -> Result<ClientConfig, AppError> {
    let read_error = |source| AppError::ReadCaFile {
        path: ca_file.to_path_buf(),
        source,
    };
    let file = File::open(ca_file).map_err(read_error)?;
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        roots.add(cert.map_err(read_error)?)?;
    }
    if roots.is_empty() {
        return Err(AppError::EmptyCaFile {
            path: ca_file.to_path_buf(),
        });
    }
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(config)
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
