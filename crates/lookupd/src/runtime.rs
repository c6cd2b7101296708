//! Handle to a daemon that is accepting connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::health::HealthReporter;
use crate::metrics::{ActiveConnections, MetricsSnapshot, ServiceMetrics};
use crate::transport::{DrainReport, ListenerError, ListenerHandle};

/// Counters and drain outcome reported once the daemon has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Final metrics.
    pub metrics: MetricsSnapshot,
    /// How the worker pool drained.
    pub drain: DrainReport,
}

/// Running daemon.
///
/// Dropping the handle without calling [`RunningDaemon::wait`] still stops
/// the accept loop, but does not wait for sessions to drain.
pub struct RunningDaemon {
    address: SocketAddr,
    listener: ListenerHandle,
    metrics: Arc<ServiceMetrics>,
    reporter: Arc<dyn HealthReporter>,
}

impl RunningDaemon {
    pub(crate) fn new(
        address: SocketAddr,
        listener: ListenerHandle,
        metrics: Arc<ServiceMetrics>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            address,
            listener,
            metrics,
            reporter,
        }
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Asks the accept loop to stop. Returns immediately.
    pub fn request_shutdown(&self) {
        self.reporter.shutdown_requested();
        self.listener.shutdown();
    }

    /// Flag the accept loop polls; storing `true` has the same effect as
    /// [`RunningDaemon::request_shutdown`].
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.listener.shutdown_flag()
    }

    /// Reports whether the accept loop has exited and the pool drained.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.listener.is_finished()
    }

    /// Live service counters.
    #[must_use]
    pub const fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Connections currently being served.
    #[must_use]
    pub fn active_connections(&self) -> &ActiveConnections {
        self.metrics.active()
    }

    /// Blocks until shutdown has been requested and every session drained
    /// or the drain timeout expired.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the accept loop panicked.
    pub fn wait(self) -> Result<ShutdownSummary, ListenerError> {
        let Self {
            listener,
            metrics,
            reporter,
            ..
        } = self;
        let drain = listener.join()?;
        let summary = ShutdownSummary {
            metrics: metrics.snapshot(),
            drain,
        };
        reporter.shutdown_completed(&summary);
        Ok(summary)
    }
}
