//! Corpus lookups.
//!
//! The store answers one question: does the corpus contain a line exactly
//! equal to the query? Lines are split on `\n` or `\r\n` and compared
//! byte-for-byte, so substrings, case variants and padded variants never
//! match.
//!
//! Two policies govern when the file is read:
//!
//! - [`LoadPolicy::Eager`] maps the corpus once in [`DataStore::open`] and
//!   keeps a deduplicated set of its lines. Later edits to the file are not
//!   observed.
//! - [`LoadPolicy::Lazy`] maps and scans the file on every
//!   [`DataStore::contains`] call, so each lookup sees the file as it is at
//!   that moment.

mod errors;
mod mapped;

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use lookup_config::Config;
use tracing::{debug, info, warn};

pub use self::errors::DataSourceError;

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// When the corpus file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LoadPolicy {
    /// Read once at startup and cache.
    Eager,
    /// Re-read on every lookup.
    Lazy,
}

impl LoadPolicy {
    /// Maps the `REREAD_ON_QUERY` option onto a policy.
    #[must_use]
    pub const fn from_reread(reread_on_query: bool) -> Self {
        if reread_on_query {
            Self::Lazy
        } else {
            Self::Eager
        }
    }
}

#[derive(Debug)]
enum Backing {
    Cached(HashSet<String>),
    Fresh,
}

/// Exact-line membership over the configured corpus.
///
/// A store is shared read-only between all session workers; none of its
/// methods take `&mut self`.
#[derive(Debug)]
pub struct DataStore {
    path: Utf8PathBuf,
    backing: Backing,
    tolerate_missing: bool,
}

impl DataStore {
    /// Opens the corpus at `path` under `policy`.
    ///
    /// With [`LoadPolicy::Eager`] the file is read immediately. When
    /// `tolerate_missing` is set (test mode) an absent corpus behaves as an
    /// empty one instead of failing.
    ///
    /// # Errors
    ///
    /// Returns a [`DataSourceError`] when the eager read fails.
    pub fn open(
        path: &Utf8Path,
        policy: LoadPolicy,
        tolerate_missing: bool,
    ) -> Result<Self, DataSourceError> {
        let backing = match policy {
            LoadPolicy::Eager => Backing::Cached(load_lines(path, tolerate_missing)?),
            LoadPolicy::Lazy => Backing::Fresh,
        };
        info!(
            target: STORE_TARGET,
            path = %path,
            %policy,
            cached_lines = match &backing {
                Backing::Cached(lines) => lines.len(),
                Backing::Fresh => 0,
            },
            "corpus store ready"
        );
        Ok(Self {
            path: path.to_owned(),
            backing,
            tolerate_missing,
        })
    }

    /// Opens the corpus named by `config`, eager unless `REREAD_ON_QUERY` is set.
    ///
    /// # Errors
    ///
    /// See [`DataStore::open`].
    pub fn from_config(config: &Config) -> Result<Self, DataSourceError> {
        Self::open(
            config.data_path(),
            LoadPolicy::from_reread(config.reread_on_query),
            config.test_mode,
        )
    }

    /// Reports whether some corpus line equals `query` exactly.
    ///
    /// # Errors
    ///
    /// Under [`LoadPolicy::Lazy`] returns a [`DataSourceError`] when the file
    /// cannot be read for this lookup. Eager stores never fail here.
    pub fn contains(&self, query: &str) -> Result<bool, DataSourceError> {
        match &self.backing {
            Backing::Cached(lines) => Ok(lines.contains(query)),
            Backing::Fresh => {
                match mapped::with_corpus(&self.path, |text| text.lines().any(|line| line == query))
                {
                    Err(error) if self.tolerate_missing && error.is_missing() => {
                        debug!(target: STORE_TARGET, %error, "corpus absent; treating as empty");
                        Ok(false)
                    }
                    other => other,
                }
            }
        }
    }

    /// Returns the policy this store was opened with.
    #[must_use]
    pub const fn policy(&self) -> LoadPolicy {
        match self.backing {
            Backing::Cached(_) => LoadPolicy::Eager,
            Backing::Fresh => LoadPolicy::Lazy,
        }
    }

    /// Returns the corpus path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the number of distinct cached lines for eager stores.
    #[must_use]
    pub fn cached_lines(&self) -> Option<usize> {
        match &self.backing {
            Backing::Cached(lines) => Some(lines.len()),
            Backing::Fresh => None,
        }
    }
}

fn load_lines(path: &Utf8Path, tolerate_missing: bool) -> Result<HashSet<String>, DataSourceError> {
    match mapped::with_corpus(path, |text| text.lines().map(str::to_owned).collect()) {
        Err(error) if tolerate_missing && error.is_missing() => {
            warn!(
                target: STORE_TARGET,
                path = %path,
                %error,
                "corpus unavailable in test mode; starting with an empty cache"
            );
            Ok(HashSet::new())
        }
        other => other,
    }
}
