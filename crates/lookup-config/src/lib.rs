//! Configuration for the lookup daemon.
//!
//! Configuration comes from three places, applied in order: built-in
//! defaults, the key/value options file, and command-line flags (with their
//! `LOOKUPD_*` environment twins). The corpus path lives in a separate pointer
//! file holding a `linuxpath=<path>` line.
//!
//! Loading is all-or-nothing. [`Config::load`] either returns a fully
//! validated value or a [`ConfigError`] naming the offending file, line and
//! key; malformed values are never replaced by defaults.

mod cli;
mod defaults;
mod errors;
mod modes;
mod options;
mod pointer;

use std::ffi::OsString;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

pub use cli::ConfigArgs;
pub use defaults::{
    CONFIG_NAMESPACE, DEFAULT_ACCEPT_TIMEOUT, DEFAULT_BACKLOG, DEFAULT_DRAIN_TIMEOUT,
    DEFAULT_HOST, DEFAULT_IO_TIMEOUT, DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES,
    DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, MAX_REQUEST_BYTES_LIMIT,
    config_directory, default_cert_path, default_key_path, default_log_format, default_options_path, default_pointer_path,
};
pub use errors::{ConfigError, SourceKind};
pub use modes::{LogFormat, ModeParseError, ServiceMode};
pub use options::{OPTIONS_SECTION, OptionsFile};
pub use pointer::{DATA_PATH_KEY, DataPointer};

/// TLS material used when the transport is encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// Whether accepted connections are wrapped in TLS.
    pub enabled: bool,
    /// PEM certificate chain presented to clients.
    pub cert_path: Utf8PathBuf,
    /// PEM private key matching the certificate.
    pub key_path: Utf8PathBuf,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_path: default_cert_path(),
            key_path: default_key_path(),
        }
    }
}

/// Sizing of the session worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Number of session workers.
    pub workers: usize,
    /// Accepted connections that may wait for a worker.
    pub queue_capacity: usize,
    /// Backlog passed to `listen(2)`.
    pub backlog: i32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backlog: DEFAULT_BACKLOG,
        }
    }
}

/// Time budgets for the acceptor, the sessions and shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Longest wait between two checks of the shutdown flag.
    pub accept: Duration,
    /// Read/write timeout on accepted connections.
    pub io: Duration,
    /// Bound on waiting for in-flight sessions at shutdown.
    pub drain: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT_TIMEOUT,
            io: DEFAULT_IO_TIMEOUT,
            drain: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Fully resolved daemon configuration. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listening port.
    pub port: u16,
    /// Bind address.
    pub host: String,
    /// Re-read the corpus on every query instead of caching it at startup.
    pub reread_on_query: bool,
    /// Transport security.
    pub tls: TlsSettings,
    /// Corpus searched in [`ServiceMode::Search`].
    pub data_path: Utf8PathBuf,
    /// Request resolution strategy.
    pub mode: ServiceMode,
    /// Worker pool sizing.
    pub pool: PoolSettings,
    /// Time budgets.
    pub timeouts: Timeouts,
    /// Size of the single bounded read per request.
    pub max_request_bytes: usize,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Tolerate a missing pointer file or corpus.
    pub test_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_owned(),
            reread_on_query: false,
            tls: TlsSettings::default(),
            data_path: Utf8PathBuf::new(),
            mode: ServiceMode::default(),
            pool: PoolSettings::default(),
            timeouts: Timeouts::default(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            test_mode: false,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any source is unreadable or malformed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any source is unreadable or malformed.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let parsed = ConfigArgs::try_parse_from(args)?;
        Self::from_args(&parsed)
    }

    /// Resolves configuration from already-parsed flags.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any source is unreadable or malformed.
    pub fn from_args(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let options_path = args
            .options_path
            .clone()
            .unwrap_or_else(default_options_path);
        let pointer_path = args
            .pointer_path
            .clone()
            .unwrap_or_else(default_pointer_path);

        let options = OptionsFile::read(&options_path)?;
        let pointer = DataPointer::read(&pointer_path, args.test_mode)?;

        let mut config = Self::from_options(&options)?;
        config.data_path = pointer.into_path();
        config.test_mode = args.test_mode;
        config.log_filter.clone_from(&args.log_filter);
        config.log_format = args.log_format;
        Ok(config)
    }

    /// Builds a configuration from an options file alone, leaving the data
    /// path empty.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed or out-of-range values.
    pub fn from_options(options: &OptionsFile) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply(options)?;
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, options: &OptionsFile) -> Result<(), ConfigError> {
        let OptionsFile {
            port,
            host,
            reread_on_query,
            ssl,
            tls,
            cert_file,
            key_file,
            mode,
            workers,
            queue_capacity,
            backlog,
            accept_timeout_ms,
            io_timeout_ms,
            drain_timeout_ms,
            max_request_bytes,
            ..
        } = options.clone();

        self.tls.enabled = match (ssl, tls) {
            (Some(ssl_enabled), Some(tls_enabled)) if ssl_enabled != tls_enabled => {
                return Err(ConfigError::ConflictingTls {
                    ssl: ssl_enabled,
                    tls: tls_enabled,
                });
            }
            (Some(enabled), _) | (None, Some(enabled)) => enabled,
            (None, None) => self.tls.enabled,
        };
        if let Some(name) = mode {
            self.mode = name.parse().map_err(|_| ConfigError::InvalidValue {
                path: options.origin().to_path_buf(),
                key: "MODE",
                expected: "'search' or 'dispatch'",
                value: name.clone(),
            })?;
        }

        self.port = port.unwrap_or(self.port);
        self.host = host.unwrap_or_else(|| self.host.clone());
        self.reread_on_query = reread_on_query.unwrap_or(self.reread_on_query);
        self.tls.cert_path = cert_file.unwrap_or_else(|| self.tls.cert_path.clone());
        self.tls.key_path = key_file.unwrap_or_else(|| self.tls.key_path.clone());
        self.pool.workers = workers.unwrap_or(self.pool.workers);
        self.pool.queue_capacity = queue_capacity.unwrap_or(self.pool.queue_capacity);
        self.pool.backlog = backlog.unwrap_or(self.pool.backlog);
        self.timeouts.accept = accept_timeout_ms.map_or(self.timeouts.accept, Duration::from_millis);
        self.timeouts.io = io_timeout_ms.map_or(self.timeouts.io, Duration::from_millis);
        self.timeouts.drain = drain_timeout_ms.map_or(self.timeouts.drain, Duration::from_millis);
        self.max_request_bytes = max_request_bytes.unwrap_or(self.max_request_bytes);
        Ok(())
    }

    /// Checks range constraints that the type system does not capture.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.pool.workers >= 1, "WORKERS", "must be at least 1")?;
        ensure(
            self.pool.queue_capacity >= 1,
            "QUEUE_CAPACITY",
            "must be at least 1",
        )?;
        ensure(self.pool.backlog >= 1, "BACKLOG", "must be at least 1")?;
        ensure(
            !self.timeouts.accept.is_zero(),
            "ACCEPT_TIMEOUT_MS",
            "must be positive",
        )?;
        ensure(!self.timeouts.io.is_zero(), "IO_TIMEOUT_MS", "must be positive")?;
        ensure(
            !self.timeouts.drain.is_zero(),
            "DRAIN_TIMEOUT_MS",
            "must be positive",
        )?;
        ensure(
            (1..=MAX_REQUEST_BYTES_LIMIT).contains(&self.max_request_bytes),
            "MAX_REQUEST_BYTES",
            "must be between 1 and 16 MiB",
        )?;
        ensure(!self.host.trim().is_empty(), "HOST", "must not be empty")
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the corpus path.
    #[must_use]
    pub fn data_path(&self) -> &Utf8Path {
        &self.data_path
    }
}

fn ensure(condition: bool, key: &'static str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            reason: reason.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn options(text: &str) -> OptionsFile {
        OptionsFile::parse(Utf8Path::new("options.conf"), &format!("[options]\n{text}"))
            .expect("options")
    }

    #[test]
    fn empty_options_apply_defaults() {
        let config = Config::from_options(&options("")).expect("config");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.reread_on_query);
        assert!(!config.tls.enabled);
        assert_eq!(config.mode, ServiceMode::Search);
        assert_eq!(config.pool, PoolSettings::default());
    }

    #[test]
    fn options_override_defaults() {
        let text = "PORT = 5000\nREREAD_ON_QUERY = true\nTLS = on\nMODE = dispatch\nWORKERS = 8\nACCEPT_TIMEOUT_MS = 50\n";
        let config = Config::from_options(&options(text)).expect("config");
        assert_eq!(config.port, 5000);
        assert!(config.reread_on_query);
        assert!(config.tls.enabled);
        assert_eq!(config.mode, ServiceMode::Dispatch);
        assert_eq!(config.pool.workers, 8);
        assert_eq!(config.timeouts.accept, Duration::from_millis(50));
    }

    #[rstest]
    #[case("SSL = true\nTLS = true\n", true)]
    #[case("SSL = yes\n", true)]
    #[case("TLS = off\n", false)]
    fn ssl_and_tls_are_aliases(#[case] text: &str, #[case] expected: bool) {
        let config = Config::from_options(&options(text)).expect("config");
        assert_eq!(config.tls.enabled, expected);
    }

    #[test]
    fn conflicting_ssl_and_tls_fail() {
        let error = Config::from_options(&options("SSL = true\nTLS = false\n")).expect_err("conflict");
        assert!(matches!(
            error,
            ConfigError::ConflictingTls {
                ssl: true,
                tls: false
            }
        ));
    }

    #[rstest]
    #[case("WORKERS = 0", "WORKERS")]
    #[case("QUEUE_CAPACITY = 0", "QUEUE_CAPACITY")]
    #[case("ACCEPT_TIMEOUT_MS = 0", "ACCEPT_TIMEOUT_MS")]
    #[case("MAX_REQUEST_BYTES = 0", "MAX_REQUEST_BYTES")]
    #[case("MAX_REQUEST_BYTES = 999999999", "MAX_REQUEST_BYTES")]
    fn out_of_range_values_fail(#[case] text: &str, #[case] expected: &str) {
        let error = Config::from_options(&options(text)).expect_err("out of range");
        assert!(matches!(error, ConfigError::OutOfRange { key, .. } if key == expected));
    }

    #[test]
    fn invalid_mode_names_the_choices() {
        let error = Config::from_options(&options("MODE = batch")).expect_err("mode");
        assert!(error.to_string().contains("'search' or 'dispatch'"));
    }
}
