use camino::Utf8PathBuf;
use clap::Parser;

use crate::LogFormat;
use crate::defaults::DEFAULT_LOG_FILTER;

/// Command-line flags accepted by `lookupd`.
///
/// Each flag has an environment twin so service managers can configure the
/// daemon without editing its unit file.
#[derive(Debug, Clone, Parser)]
#[command(name = "lookupd", version, about = "Concurrent TCP line-search and action service")]
pub struct ConfigArgs {
    /// Options file (defaults to `<config dir>/lookupd/options.conf`).
    #[arg(long, env = "LOOKUPD_OPTIONS_PATH", value_name = "PATH")]
    pub options_path: Option<Utf8PathBuf>,
    /// File holding the `linuxpath=` assignment (defaults to `<config dir>/lookupd/config`).
    #[arg(long, env = "LOOKUPD_POINTER_PATH", value_name = "PATH")]
    pub pointer_path: Option<Utf8PathBuf>,
    /// Tolerate a missing pointer file or corpus.
    #[arg(long, env = "LOOKUPD_TEST_MODE")]
    pub test_mode: bool,
    /// `tracing` filter directive.
    #[arg(long, env = "LOOKUPD_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format (`json` or `compact`).
    #[arg(long, env = "LOOKUPD_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}
