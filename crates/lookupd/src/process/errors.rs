//! Errors that end `lookupd` before or during its serve-and-drain cycle.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Why [`run_daemon`](super::run_daemon) returned without a summary.
///
/// A failed signal wait still drains sessions before it is reported.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A startup step failed before any socket was bound.
    #[error("lookupd could not start: {source}")]
    Bootstrap {
        /// First startup step that failed.
        #[source]
        source: BootstrapError,
    },
    /// Binding the port failed, or the accept loop panicked while draining.
    #[error("lookupd listener failed: {source}")]
    Listener {
        /// Bind, spawn or join failure.
        #[source]
        source: ListenerError,
    },
    /// The termination-signal wait failed; sessions were drained anyway.
    #[error("lookupd lost its termination signal handler: {source}")]
    Shutdown {
        /// Signal handler error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
