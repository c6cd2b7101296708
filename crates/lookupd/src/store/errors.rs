use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures raised while reading the corpus.
///
/// These are per-request errors: a failed lookup is reported to the client
/// that issued it and never stops the daemon.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// No corpus path was configured.
    #[error("no corpus path is configured")]
    EmptyPath,
    /// The corpus could not be opened or inspected.
    #[error("failed to open corpus '{path}': {source}")]
    Open {
        /// Corpus path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The corpus could not be memory-mapped.
    #[error("failed to map corpus '{path}': {source}")]
    Map {
        /// Corpus path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The corpus holds bytes that are not UTF-8.
    #[error("corpus '{path}' is not valid UTF-8 after byte {offset}")]
    Encoding {
        /// Corpus path.
        path: Utf8PathBuf,
        /// Length of the valid prefix.
        offset: usize,
    },
}

impl DataSourceError {
    /// Reports whether the corpus is absent rather than unreadable.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::EmptyPath => true,
            Self::Open { source, .. } => source.kind() == io::ErrorKind::NotFound,
            Self::Map { .. } | Self::Encoding { .. } => false,
        }
    }
}
