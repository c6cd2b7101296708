//! Reader for the file that names the corpus path.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::errors::{ConfigError, SourceKind};

/// Assignment prefix that introduces the corpus path.
pub const DATA_PATH_KEY: &str = "linuxpath";

/// Corpus location resolved from the pointer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPointer {
    path: Utf8PathBuf,
}

impl DataPointer {
    /// Reads the pointer file at `path`.
    ///
    /// When `test_mode` is set a missing pointer file resolves to an empty
    /// path instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::MissingDataPath`] or [`ConfigError::EmptyDataPath`] when
    /// it lacks a usable assignment.
    pub fn read(path: &Utf8Path, test_mode: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(path, &text),
            Err(error) if error.kind() == io::ErrorKind::NotFound && test_mode => Ok(Self {
                path: Utf8PathBuf::new(),
            }),
            Err(error) => Err(ConfigError::read(SourceKind::Pointer, path, error)),
        }
    }

    /// Scans `text` line by line for the first `linuxpath=` assignment.
    ///
    /// # Errors
    ///
    /// See [`DataPointer::read`].
    pub fn parse(origin: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        let value = text
            .lines()
            .find_map(|line| line.strip_prefix(DATA_PATH_KEY)?.strip_prefix('='))
            .ok_or_else(|| ConfigError::MissingDataPath {
                path: origin.to_path_buf(),
                key: DATA_PATH_KEY,
            })?
            .trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyDataPath {
                path: origin.to_path_buf(),
            });
        }
        Ok(Self {
            path: Utf8PathBuf::from(value),
        })
    }

    /// Returns the corpus path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Consumes the pointer and returns the corpus path.
    #[must_use]
    pub fn into_path(self) -> Utf8PathBuf {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> &'static Utf8Path {
        Utf8Path::new("config")
    }

    #[test]
    fn finds_first_assignment() {
        let text = "# corpus\nwinpath=C:\\data.txt\nlinuxpath= /srv/corpus.txt \nlinuxpath=/other\n";
        let pointer = DataPointer::parse(origin(), text).expect("pointer");
        assert_eq!(pointer.path().as_str(), "/srv/corpus.txt");
    }

    #[test]
    fn requires_exact_prefix() {
        let error = DataPointer::parse(origin(), "linuxpaths=/x\n").expect_err("no match");
        assert!(matches!(error, ConfigError::MissingDataPath { .. }));
    }

    #[test]
    fn rejects_empty_value() {
        let error = DataPointer::parse(origin(), "linuxpath=   \n").expect_err("empty");
        assert!(matches!(error, ConfigError::EmptyDataPath { .. }));
    }

    #[test]
    fn missing_file_is_fatal_outside_test_mode() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config")).expect("utf8");
        let error = DataPointer::read(&path, false).expect_err("missing");
        assert!(matches!(
            error,
            ConfigError::Read {
                kind: SourceKind::Pointer,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_tolerated_in_test_mode() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config")).expect("utf8");
        let pointer = DataPointer::read(&path, true).expect("tolerated");
        assert_eq!(pointer.path().as_str(), "");
    }
}
