//! Bootstrap, serve until a termination signal arrives, then drain.

use std::sync::Arc;

use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::ActionRegistry;
use crate::health::HealthReporter;
use crate::runtime::ShutdownSummary;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) registry: ActionRegistry,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) shutdown: S,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs the daemon using the production collaborators.
///
/// Blocks until a termination signal arrives, then drains sessions and
/// returns the final counters.
///
/// # Errors
///
/// Returns a [`LaunchError`] when startup fails or the listener thread
/// panics.
pub fn run_daemon() -> Result<ShutdownSummary, LaunchError> {
    let plan = LaunchPlan {
        shutdown: SystemShutdownSignal::install()?,
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            registry: ActionRegistry::with_builtins(),
        },
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<ShutdownSummary, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan { shutdown, services } = plan;
    let ServiceDeps {
        loader,
        reporter,
        registry,
    } = services;

    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let daemon = bootstrap_with(&loader, reporter, registry)?;
    let running = daemon.start()?;

    let waited = shutdown.wait();
    if let Err(error) = &waited {
        warn!(target: PROCESS_TARGET, %error, "shutdown listener failed; stopping");
    }
    running.request_shutdown();
    let summary = running.wait()?;
    waited?;

    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(summary)
}
