use std::time::Duration;

use camino::Utf8PathBuf;

/// Directory below the platform configuration root that holds every lookupd file.
pub const CONFIG_NAMESPACE: &str = "lookupd";

/// Port used when the options file does not set `PORT`.
pub const DEFAULT_PORT: u16 = 44445;

/// Bind address covering every interface.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Number of session workers in the bounded pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Connections that may wait for a free worker before new ones are rejected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Pending-connection backlog handed to `listen(2)`.
pub const DEFAULT_BACKLOG: i32 = 128;

/// Longest interval between two checks of the shutdown flag.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_millis(250);

/// Read and write timeout applied to every accepted connection.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on waiting for in-flight sessions during shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of the single bounded read performed per request.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Largest accepted value for `MAX_REQUEST_BYTES`.
pub const MAX_REQUEST_BYTES_LIMIT: usize = 16 * 1024 * 1024;

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::LogFormat {
    crate::LogFormat::Json
}

/// Directory holding the options file, the pointer file and the TLS material.
#[must_use]
pub fn config_directory() -> Utf8PathBuf {
    let base = dirs::config_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    base.join(CONFIG_NAMESPACE)
}

/// Location of the options file when `--options-path` is not given.
#[must_use]
pub fn default_options_path() -> Utf8PathBuf {
    config_directory().join("options.conf")
}

/// Location of the data-path pointer file when `--pointer-path` is not given.
#[must_use]
pub fn default_pointer_path() -> Utf8PathBuf {
    config_directory().join("config")
}

/// Certificate chain used when TLS is enabled without `CERT_FILE`.
#[must_use]
pub fn default_cert_path() -> Utf8PathBuf {
    config_directory().join("ssl").join("ssl.pem")
}

/// Private key used when TLS is enabled without `KEY_FILE`.
#[must_use]
pub fn default_key_path() -> Utf8PathBuf {
    config_directory().join("ssl").join("private.key")
}
