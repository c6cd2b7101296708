//! Shared harness for the daemon behaviour suites.

mod config_loader;
mod reporter;
mod world;

pub use config_loader::FailingConfigLoader;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{DaemonWorld, SLOW_ACTION, query, world};
