//! Error types for the client runtime.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("action content is not valid JSON: {0}")]
    InvalidContent(serde_json::Error),
    #[error("--tls requires --ca-file")]
    MissingCaFile,
    #[error("failed to read CA file '{path}': {source}")]
    ReadCaFile { path: Utf8PathBuf, source: io::Error },
    #[error("CA file '{path}' contains no usable certificates")]
    EmptyCaFile { path: Utf8PathBuf },
    #[error("invalid TLS server name '{name}'")]
    ServerName { name: String },
    #[error("failed to configure TLS: {0}")]
    Tls(#[from] rustls::Error),
    #[error("failed to resolve daemon address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to serialise action request: {0}")]
    SerialiseRequest(serde_json::Error),
    #[error("failed to send request to daemon: {0}")]
    SendRequest(io::Error),
    #[error("failed to read response from daemon: {0}")]
    ReadResponse(io::Error),
    #[error("daemon closed the connection without replying")]
    EmptyReply,
    #[error("failed to parse daemon reply: {0}")]
    ParseMessage(serde_json::Error),
    #[error("daemon reported an error: {0}")]
    Daemon(String),
    #[error("failed to write output: {0}")]
    ForwardResponse(io::Error),
}
