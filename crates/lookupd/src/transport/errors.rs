//! Error types for the listener, the worker pool and TLS setup.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors surfaced while binding or running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// `HOST` and `PORT` could not be resolved.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no address.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Creating or tuning the socket failed.
    #[error("failed to configure TCP socket for {addr}: {source}")]
    Socket {
        /// Address being bound.
        addr: SocketAddr,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// The address is in use or not permitted.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address being bound.
        addr: SocketAddr,
        /// Bind error.
        #[source]
        source: io::Error,
    },
    /// `listen(2)` rejected the backlog.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// Bound address.
        addr: SocketAddr,
        /// Listen error.
        #[source]
        source: io::Error,
    },
    /// The listening socket could not be made non-blocking.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A listener or worker thread could not be started.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Which thread was being started.
        role: &'static str,
        /// Spawn error.
        #[source]
        source: io::Error,
    },
    /// The accept loop panicked before draining.
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Fatal errors raised while preparing TLS material at startup.
#[derive(Debug, Error)]
pub enum TlsSetupError {
    /// A PEM file could not be read.
    #[error("failed to read TLS material '{path}': {source}")]
    Read {
        /// File that failed.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The certificate file held no certificates.
    #[error("no certificates found in '{path}'")]
    NoCertificates {
        /// Certificate file.
        path: Utf8PathBuf,
    },
    /// The key file held no private key.
    #[error("no private key found in '{path}'")]
    NoPrivateKey {
        /// Key file.
        path: Utf8PathBuf,
    },
    /// `rustls` rejected the certificate or key.
    #[error("invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
}
