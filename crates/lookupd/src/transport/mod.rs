//! TCP transport: the listener, the session worker pool and optional TLS.
//!
//! One acceptor thread polls the listening socket and hands each connection
//! to a bounded queue drained by a fixed set of workers. When the queue is
//! full the connection is dropped and counted as rejected.

mod errors;
mod listener;
mod pool;
mod stream;
#[cfg(test)]
pub(crate) mod test_utils;
mod tls;

pub use self::errors::{ListenerError, TlsSetupError};
pub(crate) use self::listener::{AcceptSettings, ListenerHandle, SocketListener};
pub use self::pool::DrainReport;
pub(crate) use self::pool::WorkerPool;
pub(crate) use self::stream::{AcceptedConnection, ConnectionHandler, ConnectionStream};
pub use self::tls::TlsAcceptor;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
