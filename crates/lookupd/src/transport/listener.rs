//! TCP listener and accept loop.
//!
//! The accept loop polls a non-blocking socket and re-checks the shutdown
//! flag at least once per accept timeout. Accepted connections go straight
//! to the [`WorkerPool`]; the loop itself never reads from a client.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use crate::metrics::ServiceMetrics;

use super::pool::{DrainReport, Submission, WorkerPool};
use super::{AcceptedConnection, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Timing for the accept loop and its shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AcceptSettings {
    /// Longest interval between two checks of the shutdown flag.
    pub(crate) accept_timeout: Duration,
    /// Bound on waiting for sessions once accepting stops.
    pub(crate) drain_timeout: Duration,
}

/// Bound TCP listener that has not started accepting yet.
#[derive(Debug)]
pub(crate) struct SocketListener {
    address: SocketAddr,
    listener: TcpListener,
}

impl SocketListener {
    /// Binds `host:port` with `SO_REUSEADDR` and the given listen backlog.
    pub(crate) fn bind(host: &str, port: u16, backlog: i32) -> Result<Self, ListenerError> {
        let addr = resolve(host, port)?;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| ListenerError::Socket { addr, source })?;
        socket
            .set_reuse_address(true)
            .map_err(|source| ListenerError::Socket { addr, source })?;
        socket
            .bind(&addr.into())
            .map_err(|source| ListenerError::BindTcp { addr, source })?;
        socket
            .listen(backlog)
            .map_err(|source| ListenerError::Listen { addr, source })?;
        let listener: TcpListener = socket.into();
        let address = listener
            .local_addr()
            .map_err(|source| ListenerError::Socket { addr, source })?;
        Ok(Self { address, listener })
    }

    /// Address actually bound, with the kernel-chosen port when `port` was 0.
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Starts the accept loop on a background thread.
    pub(crate) fn start(
        self,
        pool: WorkerPool,
        settings: AcceptSettings,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(format!("{}-acceptor", env!("CARGO_PKG_NAME")))
            .spawn(move || run_accept_loop(self, pool, settings, &metrics, &shutdown_flag))
            .map_err(|source| ListenerError::Spawn {
                role: "acceptor",
                source,
            })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept loop.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<DrainReport>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Flag polled by the accept loop; setting it starts shutdown.
    pub(crate) fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(thread::JoinHandle::is_finished)
    }

    /// Waits for the loop to stop and the pool to drain.
    pub(crate) fn join(mut self) -> Result<DrainReport, ListenerError> {
        self.handle.take().map_or_else(
            || Ok(DrainReport::default()),
            |handle| handle.join().map_err(|_| ListenerError::ThreadPanic),
        )
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: SocketListener,
    pool: WorkerPool,
    settings: AcceptSettings,
    metrics: &ServiceMetrics,
    shutdown: &AtomicBool,
) -> DrainReport {
    info!(
        target: LISTENER_TARGET,
        address = %listener.address,
        workers = pool.size(),
        "socket listener active"
    );
    let idle = settings.accept_timeout.min(ACCEPT_BACKOFF);
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some(connection)) => {
                last_error = None;
                hand_off(&pool, connection, metrics);
            }
            Ok(None) => thread::sleep(idle),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(settings.accept_timeout.min(ERROR_BACKOFF));
            }
        }
    }

    drop(listener);
    info!(
        target: LISTENER_TARGET,
        active = metrics.active().len(),
        "listener stopped; draining sessions"
    );
    metrics.active().interrupt_idle_reads();
    let report = pool.drain(settings.drain_timeout);
    if report.is_complete() {
        info!(target: LISTENER_TARGET, workers = report.joined, "session workers drained");
    } else {
        warn!(
            target: LISTENER_TARGET,
            abandoned = report.abandoned,
            timeout_ms = settings.drain_timeout.as_millis(),
            "drain timeout expired with sessions still running"
        );
    }
    report
}

fn hand_off(pool: &WorkerPool, connection: AcceptedConnection, metrics: &ServiceMetrics) {
    let peer = connection.peer();
    match pool.submit(connection) {
        Submission::Queued => {
            debug!(target: LISTENER_TARGET, %peer, "connection queued");
        }
        Submission::Full(connection) => {
            metrics.record_rejected();
            warn!(target: LISTENER_TARGET, %peer, "worker queue full; dropping connection");
            drop(connection);
        }
        Submission::Closed(connection) => {
            metrics.record_rejected();
            warn!(target: LISTENER_TARGET, %peer, "worker pool closed; dropping connection");
            drop(connection);
        }
    }
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<AcceptedConnection>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(AcceptedConnection::new(stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })
}
