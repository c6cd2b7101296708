//! Error types for session handling.

use std::io;

use thiserror::Error;

use super::SessionState;

/// Transport failures that end a session in `ERROR_CLOSED`.
///
/// They are isolated to the connection that raised them.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Read or write timeouts could not be applied.
    #[error("failed to configure connection: {0}")]
    Configure(#[source] io::Error),
    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),
    /// Reading the request failed.
    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),
    /// Writing the reply failed.
    #[error("failed to write reply: {0}")]
    Write(#[source] io::Error),
}

/// Request-level decoding failures reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The query bytes are not UTF-8.
    #[error("request is not valid UTF-8 after byte {valid_up_to}")]
    NotUtf8 {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },
    /// The request filled the whole read buffer and may be truncated.
    #[error("request exceeds the {limit} byte limit")]
    Oversized {
        /// Configured `MAX_REQUEST_BYTES`.
        limit: usize,
    },
}

/// Reasons a session ends in `ERROR_CLOSED`.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    /// The connection failed.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The handler attempted a transition the state machine forbids.
    #[error("illegal session transition from {from} to {to}")]
    Transition {
        /// State the session was in.
        from: SessionState,
        /// State it was asked to enter.
        to: SessionState,
    },
}
