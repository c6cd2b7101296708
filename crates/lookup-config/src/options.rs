//! The key/value options file.
//!
//! The file is INI: every assignment lives in an `[options]` section, other
//! sections are ignored, and `#`/`;` start comments. Values are read through
//! the `config` crate and deserialised into [`OptionsFile`], which rejects
//! keys it does not know. Keys may be written in upper or lower case.

use camino::{Utf8Path, Utf8PathBuf};
use config::{File, FileFormat, Source, ValueKind};
use serde::Deserialize;

use crate::errors::ConfigError;

/// Section whose assignments configure the daemon.
pub const OPTIONS_SECTION: &str = "options";

/// Assignments read from the `[options]` section. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsFile {
    #[serde(skip)]
    origin: Utf8PathBuf,
    /// `PORT`.
    #[serde(alias = "PORT")]
    pub port: Option<u16>,
    /// `HOST`.
    #[serde(alias = "HOST")]
    pub host: Option<String>,
    /// `REREAD_ON_QUERY`.
    #[serde(alias = "REREAD_ON_QUERY")]
    pub reread_on_query: Option<bool>,
    /// `SSL`, an alias of `TLS`.
    #[serde(alias = "SSL")]
    pub ssl: Option<bool>,
    /// `TLS`.
    #[serde(alias = "TLS")]
    pub tls: Option<bool>,
    /// `CERT_FILE`.
    #[serde(alias = "CERT_FILE")]
    pub cert_file: Option<Utf8PathBuf>,
    /// `KEY_FILE`.
    #[serde(alias = "KEY_FILE")]
    pub key_file: Option<Utf8PathBuf>,
    /// `MODE`, parsed case-insensitively once loaded.
    #[serde(alias = "MODE")]
    pub mode: Option<String>,
    /// `WORKERS`.
    #[serde(alias = "WORKERS")]
    pub workers: Option<usize>,
    /// `QUEUE_CAPACITY`.
    #[serde(alias = "QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,
    /// `BACKLOG`.
    #[serde(alias = "BACKLOG")]
    pub backlog: Option<i32>,
    /// `ACCEPT_TIMEOUT_MS`.
    #[serde(alias = "ACCEPT_TIMEOUT_MS")]
    pub accept_timeout_ms: Option<u64>,
    /// `IO_TIMEOUT_MS`.
    #[serde(alias = "IO_TIMEOUT_MS")]
    pub io_timeout_ms: Option<u64>,
    /// `DRAIN_TIMEOUT_MS`.
    #[serde(alias = "DRAIN_TIMEOUT_MS")]
    pub drain_timeout_ms: Option<u64>,
    /// `MAX_REQUEST_BYTES`.
    #[serde(alias = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: Option<usize>,
}

impl OptionsFile {
    /// Reads the options file at `path`.
    ///
    /// A missing file yields no assignments, so every key keeps its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Options`] when the file is unreadable, is not
    /// valid INI, names an unknown key or holds a value of the wrong type.
    pub fn read(path: &Utf8Path) -> Result<Self, ConfigError> {
        Self::load(path, File::new(path.as_str(), FileFormat::Ini).required(false))
    }

    /// Parses options text. `origin` only appears in error messages.
    ///
    /// # Errors
    ///
    /// See [`OptionsFile::read`].
    pub fn parse(origin: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        Self::load(origin, File::from_str(text, FileFormat::Ini))
    }

    fn load<S>(origin: &Utf8Path, file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let layered = config::Config::builder()
            .add_source(file)
            .build()
            .map_err(|source| ConfigError::options(origin, source))?;

        let document = layered
            .collect()
            .map_err(|source| ConfigError::options(origin, source))?;
        if let Some(key) = document
            .iter()
            .find_map(|(key, value)| (!matches!(value.kind, ValueKind::Table(_))).then_some(key))
        {
            return Err(ConfigError::OutsideSection {
                path: origin.to_path_buf(),
                key: key.clone(),
            });
        }

        let options = match layered.get::<Self>(OPTIONS_SECTION) {
            Ok(options) => options,
            Err(config::ConfigError::NotFound(_)) => Self::default(),
            Err(source) => return Err(ConfigError::options(origin, source)),
        };
        Ok(Self {
            origin: origin.to_path_buf(),
            ..options
        })
    }

    /// File the options were read from.
    #[must_use]
    pub fn origin(&self) -> &Utf8Path {
        &self.origin
    }
}
