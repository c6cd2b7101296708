//! Accepted connections and the streams sessions read and write.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Instant;

use rustls::{ServerConnection, StreamOwned};
use tracing::debug;

use super::LISTENER_TARGET;

/// Connection taken off the listener and waiting for a worker.
#[derive(Debug)]
pub(crate) struct AcceptedConnection {
    stream: TcpStream,
    peer: SocketAddr,
    accepted_at: Instant,
}

impl AcceptedConnection {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            accepted_at: Instant::now(),
        }
    }

    pub(crate) const fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) const fn accepted_at(&self) -> Instant {
        self.accepted_at
    }

    pub(crate) fn into_stream(self) -> TcpStream {
        self.stream
    }
}

/// Byte stream owned by a session, plain or encrypted.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl ConnectionStream {
    /// Underlying TCP socket.
    pub(crate) const fn socket(&self) -> &TcpStream {
        match self {
            Self::Tcp(stream) => stream,
            Self::Tls(stream) => &stream.sock,
        }
    }

    pub(crate) const fn is_encrypted(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Sends a TLS close notification when encrypted, then shuts the socket.
    pub(crate) fn close(&mut self) {
        if let Self::Tls(stream) = self {
            stream.conn.send_close_notify();
            if let Err(error) = stream.flush() {
                debug!(target: LISTENER_TARGET, %error, "failed to flush close_notify");
            }
        }
        if let Err(error) = self.socket().shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(target: LISTENER_TARGET, %error, "socket shutdown failed");
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
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

/// Handles accepted connections on a worker thread.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking;
    /// a panic is contained by the worker and logged.
    fn handle(&self, connection: AcceptedConnection);
}
