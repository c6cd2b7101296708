//! Read-only memory mapping of the corpus file.

use std::fs::File;

use camino::Utf8Path;
use memmap2::Mmap;

use super::DataSourceError;

/// Maps the corpus at `path` and hands its text to `visit`.
///
/// The mapping lives only for the duration of the call.
pub(super) fn with_corpus<T>(
    path: &Utf8Path,
    visit: impl FnOnce(&str) -> T,
) -> Result<T, DataSourceError> {
    if path.as_str().is_empty() {
        return Err(DataSourceError::EmptyPath);
    }
    let file = File::open(path).map_err(|source| DataSourceError::Open {
        path: path.to_owned(),
        source,
    })?;
    let length = file
        .metadata()
        .map_err(|source| DataSourceError::Open {
            path: path.to_owned(),
            source,
        })?
        .len();
    if length == 0 {
        return Ok(visit(""));
    }

    // SAFETY: the map is read-only and never outlives `file`. The corpus must
    // be replaced by rename rather than truncated in place while mapped.
    let map = unsafe { Mmap::map(&file) }.map_err(|source| DataSourceError::Map {
        path: path.to_owned(),
        source,
    })?;
    let text = std::str::from_utf8(&map).map_err(|error| DataSourceError::Encoding {
        path: path.to_owned(),
        offset: error.valid_up_to(),
    })?;
    Ok(visit(text))
}
