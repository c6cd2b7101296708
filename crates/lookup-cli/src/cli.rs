//! Command-line interface for the `lookup` client.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use lookup_config::DEFAULT_PORT;

/// Sends one request to a `lookupd` daemon and prints the reply.
#[derive(Parser, Debug)]
#[command(name = "lookup", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Daemon host name or address.
    #[arg(long, env = "LOOKUP_HOST", default_value = "127.0.0.1")]
    pub(crate) host: String,
    /// Daemon port.
    #[arg(long, env = "LOOKUP_PORT", default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// Connect over TLS.
    #[arg(long, env = "LOOKUP_TLS")]
    pub(crate) tls: bool,
    /// PEM bundle of certificate authorities trusted for `--tls`.
    #[arg(long, env = "LOOKUP_CA_FILE", value_name = "PATH", requires = "tls")]
    pub(crate) ca_file: Option<Utf8PathBuf>,
    /// Name checked against the server certificate (defaults to `--host`).
    #[arg(long, value_name = "NAME", requires = "tls")]
    pub(crate) server_name: Option<String>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Asks whether a line occurs verbatim in the daemon's corpus.
    Search {
        /// Line to look up.
        text: String,
    },
    /// Invokes a registered action on a daemon running in dispatch mode.
    Action {
        /// Action name.
        name: String,
        /// JSON content passed to the handler (defaults to `null`).
        content: Option<String>,
    },
}
