//! Loader that exercises the real configuration path and fails.

use std::ffi::OsString;

use lookup_config::{Config, ConfigError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Points the loader at a directory with no pointer file outside test mode.
pub struct FailingConfigLoader {
    dir: TempDir,
}

impl FailingConfigLoader {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temporary directory"),
        }
    }
}

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_iter([
            OsString::from("lookupd"),
            OsString::from("--options-path"),
            self.dir.path().join("options.conf").into_os_string(),
            OsString::from("--pointer-path"),
            self.dir.path().join("config").into_os_string(),
        ])
    }
}
