//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use lookup_config::Config;

use crate::bootstrap::BootstrapError;
use crate::runtime::ShutdownSummary;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections on `address`.
    fn listener_ready(&self, address: SocketAddr, config: &Config);

    /// Invoked when shutdown has been requested.
    fn shutdown_requested(&self);

    /// Invoked after the listener stopped and sessions drained.
    fn shutdown_completed(&self, summary: &ShutdownSummary);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, address: SocketAddr, config: &Config) {
        (**self).listener_ready(address, config);
    }

    fn shutdown_requested(&self) {
        (**self).shutdown_requested();
    }

    fn shutdown_completed(&self, summary: &ShutdownSummary) {
        (**self).shutdown_completed(summary);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            mode = %config.mode,
            corpus = %config.data_path(),
            reread_on_query = config.reread_on_query,
            tls = config.tls.enabled,
            test_mode = config.test_mode,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_ready(&self, address: SocketAddr, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            %address,
            workers = config.pool.workers,
            queue_capacity = config.pool.queue_capacity,
            "accepting connections"
        );
    }

    fn shutdown_requested(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_requested",
            "shutdown requested"
        );
    }

    fn shutdown_completed(&self, summary: &ShutdownSummary) {
        let metrics = &summary.metrics;
        let average_us = metrics
            .average_latency()
            .map_or(0, |average| average.as_micros());
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_completed",
            sessions = metrics.sessions,
            failed = metrics.failed,
            rejected = metrics.rejected,
            average_latency_us = average_us,
            drained = summary.drain.is_complete(),
            abandoned_workers = summary.drain.abandoned,
            "daemon stopped"
        );
    }
}
