//! Daemon bootstrap orchestration.

use std::sync::Arc;

use lookup_config::{Config, ConfigError, ServiceMode};
use thiserror::Error;

use crate::dispatch::ActionRegistry;
use crate::health::HealthReporter;
use crate::metrics::ServiceMetrics;
use crate::runtime::RunningDaemon;
use crate::session::{DispatchResolver, RequestResolver, SearchResolver, SessionHandler, SessionLimits};
use crate::store::{DataSourceError, DataStore};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{
    AcceptSettings, ListenerError, SocketListener, TlsAcceptor, TlsSetupError, WorkerPool,
};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when configuration is missing or malformed.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that returns a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-validated configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap. Every variant is fatal.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The eager corpus load failed.
    #[error("failed to load corpus: {source}")]
    DataSource {
        /// Underlying store error.
        #[source]
        source: DataSourceError,
    },
    /// TLS material could not be loaded.
    #[error("failed to prepare TLS: {source}")]
    Tls {
        /// Underlying TLS error.
        #[source]
        source: TlsSetupError,
    },
}

/// Bootstrapped daemon that has not bound its socket yet.
pub struct Daemon {
    config: Config,
    resolver: Arc<dyn RequestResolver>,
    tls: Option<TlsAcceptor>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Binds the listener, spawns the worker pool and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the address cannot be bound or a
    /// thread cannot be spawned.
    pub fn start(self) -> Result<RunningDaemon, ListenerError> {
        let Self {
            config,
            resolver,
            tls,
            reporter,
            ..
        } = self;
        let metrics = Arc::new(ServiceMetrics::new());

        let listener = SocketListener::bind(&config.host, config.port, config.pool.backlog)?;
        let address = listener.local_addr();
        let handler = Arc::new(SessionHandler::new(
            resolver,
            tls,
            Arc::clone(&metrics),
            SessionLimits {
                max_request_bytes: config.max_request_bytes,
                io_timeout: config.timeouts.io,
            },
        ));
        let pool = WorkerPool::spawn(config.pool.workers, config.pool.queue_capacity, handler)?;
        let handle = listener.start(
            pool,
            AcceptSettings {
                accept_timeout: config.timeouts.accept,
                drain_timeout: config.timeouts.drain,
            },
            Arc::clone(&metrics),
        )?;

        reporter.listener_ready(address, &config);
        Ok(RunningDaemon::new(address, handle, metrics, reporter))
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// `registry` backs dispatch mode and is unused in search mode.
///
/// # Errors
///
/// Returns a [`BootstrapError`] for any fatal startup failure; the reporter
/// has already been told about it.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    registry: ActionRegistry,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader, registry) {
        Ok((config, resolver, tls, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                resolver,
                tls,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

type Prepared = (
    Config,
    Arc<dyn RequestResolver>,
    Option<TlsAcceptor>,
    TelemetryHandle,
);

fn prepare(loader: &dyn ConfigLoader, registry: ActionRegistry) -> Result<Prepared, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let tls = if config.tls.enabled {
        let acceptor = TlsAcceptor::from_pem_files(&config.tls.cert_path, &config.tls.key_path)
            .map_err(|source| BootstrapError::Tls { source })?;
        Some(acceptor)
    } else {
        None
    };

    let resolver: Arc<dyn RequestResolver> = match config.mode {
        ServiceMode::Search => {
            let store = DataStore::from_config(&config)
                .map_err(|source| BootstrapError::DataSource { source })?;
            Arc::new(SearchResolver::new(store))
        }
        ServiceMode::Dispatch => Arc::new(DispatchResolver::new(registry)),
    };

    Ok((config, resolver, tls, telemetry))
}
