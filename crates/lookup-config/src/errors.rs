//! Error types for configuration loading.

use std::io;

use camino::Utf8PathBuf;
use strum::Display;
use thiserror::Error;

/// Which configuration source an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// The key/value options file.
    Options,
    /// The file naming the corpus path.
    Pointer,
}

/// Errors surfaced while loading the daemon configuration.
///
/// Every variant is fatal: the daemon exits before binding a socket.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line parsing failed, or help/version output was requested.
    #[error(transparent)]
    Arguments(#[from] clap::Error),
    /// A configuration file exists but could not be read.
    #[error("failed to read {kind} file '{path}': {source}")]
    Read {
        /// Which file failed.
        kind: SourceKind,
        /// Path that was read.
        path: Utf8PathBuf,
        /// I/O error.
        #[source]
        source: io::Error,
    },
    /// The options file is unreadable, not valid INI, or holds an unknown
    /// key or a value of the wrong type.
    #[error("invalid options file '{path}': {source}")]
    Options {
        /// Options file path.
        path: Utf8PathBuf,
        /// Error reported while reading or deserialising the file.
        #[source]
        source: Box<config::ConfigError>,
    },
    /// An assignment appears before the `[options]` header.
    #[error("{path}: option '{key}' must be inside the [options] section")]
    OutsideSection {
        /// Options file path.
        path: Utf8PathBuf,
        /// Offending key as written.
        key: String,
    },
    /// The option value does not name one of the accepted choices.
    #[error("{path}: option '{key}' expects {expected}, got '{value}'")]
    InvalidValue {
        /// Options file path.
        path: Utf8PathBuf,
        /// Option name.
        key: &'static str,
        /// Accepted values.
        expected: &'static str,
        /// Value as written.
        value: String,
    },
    /// The option parsed but lies outside its permitted range.
    #[error("option '{key}' is out of range: {reason}")]
    OutOfRange {
        /// Option name.
        key: &'static str,
        /// Why the value was refused.
        reason: String,
    },
    /// `SSL` and `TLS` were both given with different values.
    #[error("options SSL ({ssl}) and TLS ({tls}) disagree")]
    ConflictingTls {
        /// Value given for `SSL`.
        ssl: bool,
        /// Value given for `TLS`.
        tls: bool,
    },
    /// The pointer file has no data-path assignment.
    #[error("pointer file '{path}' has no '{key}=' assignment")]
    MissingDataPath {
        /// Pointer file path.
        path: Utf8PathBuf,
        /// Expected assignment key.
        key: &'static str,
    },
    /// The pointer file assigns an empty data path.
    #[error("pointer file '{path}' assigns an empty data path")]
    EmptyDataPath {
        /// Pointer file path.
        path: Utf8PathBuf,
    },
}

impl ConfigError {
    pub(crate) fn options(path: &camino::Utf8Path, source: config::ConfigError) -> Self {
        Self::Options {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    pub(crate) fn read(kind: SourceKind, path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Read {
            kind,
            path: path.into(),
            source,
        }
    }
}
