//! Concurrent TCP line-search and action-dispatch daemon.
//!
//! `lookupd` answers short requests over plain TCP or TLS. What a request
//! means depends on the configured [`ServiceMode`]:
//!
//! - **search**: the request is one line of text, padded with trailing NUL
//!   bytes or whitespace at the client's discretion. The reply is
//!   `STRING EXISTS` when the line occurs verbatim in the corpus and
//!   `STRING NOT FOUND` otherwise. The connection closes after the reply.
//! - **dispatch**: the request is a JSON object `{"action", "content"}`
//!   routed through an [`ActionRegistry`]. Replies are `{"action",
//!   "response"}` envelopes, with `"action": "error"` on failure, and the
//!   connection stays open for further requests.
//!
//! The corpus is either loaded once into memory or re-read on every query
//! (`REREAD_ON_QUERY`). A single acceptor thread feeds a fixed worker pool
//! through a bounded queue; connections that arrive while the queue is full
//! are dropped and counted.
//!
//! Startup failures (configuration, TLS material, an eager corpus load) are
//! fatal. Everything after that is contained to the connection or request
//! that caused it.

mod bootstrap;
pub mod dispatch;
mod health;
mod metrics;
mod panics;
mod process;
mod runtime;
pub mod session;
pub mod store;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{ActionHandler, ActionRegistry, DispatchError, HandlerError, RegistryError};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use lookup_config::{Config, ConfigError, ServiceMode};
pub use metrics::{
    ActiveConnections, BroadcastReport, MetricsSnapshot, ServiceMetrics, SessionOutcome,
};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use runtime::{RunningDaemon, ShutdownSummary};
pub use store::{DataSourceError, DataStore, LoadPolicy};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{DrainReport, ListenerError, TlsAcceptor, TlsSetupError};

#[cfg(test)]
mod tests;
