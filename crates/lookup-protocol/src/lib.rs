//! Wire types shared by `lookupd` and its clients.
//!
//! Every reply the daemon writes is a single newline-terminated frame. In
//! search mode the frame is one of the fixed status lines below; in dispatch
//! mode it is a JSON [`ActionResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply sent when the query matches a corpus line exactly.
pub const STRING_EXISTS: &str = "STRING EXISTS";
/// Reply sent when no corpus line matches the query.
pub const STRING_NOT_FOUND: &str = "STRING NOT FOUND";
/// Reply sent when the corpus could not be consulted.
pub const SERVER_ERROR: &str = "SERVER ERROR";
/// Reply sent when the query bytes could not be decoded.
pub const INVALID_REQUEST: &str = "INVALID REQUEST";

/// Action name carried by every failure envelope.
pub const ERROR_ACTION: &str = "error";

/// Terminator appended to every reply frame.
pub const FRAME_TERMINATOR: u8 = b'\n';

/// Result of a search query as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchReply {
    /// The query matched a corpus line.
    Exists,
    /// The query matched no corpus line.
    NotFound,
    /// The daemon could not read the corpus.
    ServerError,
    /// The daemon could not decode the query.
    InvalidRequest,
}

impl SearchReply {
    /// Returns the status line for this reply.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exists => STRING_EXISTS,
            Self::NotFound => STRING_NOT_FOUND,
            Self::ServerError => SERVER_ERROR,
            Self::InvalidRequest => INVALID_REQUEST,
        }
    }

    /// Maps a received status line back to a reply, ignoring the terminator.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim_end() {
            STRING_EXISTS => Some(Self::Exists),
            STRING_NOT_FOUND => Some(Self::NotFound),
            SERVER_ERROR => Some(Self::ServerError),
            INVALID_REQUEST => Some(Self::InvalidRequest),
            _ => None,
        }
    }

    /// Reports whether the reply answers the query rather than failing it.
    #[must_use]
    pub const fn is_answer(self) -> bool {
        matches!(self, Self::Exists | Self::NotFound)
    }
}

/// Request envelope accepted in dispatch mode.
///
/// `content` defaults to `null` when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Registered action to invoke.
    pub action: String,
    /// Handler input, passed through verbatim.
    #[serde(default)]
    pub content: Value,
}

impl ActionRequest {
    /// Builds a request for `action` carrying `content`.
    #[must_use]
    pub fn new(action: impl Into<String>, content: Value) -> Self {
        Self {
            action: action.into(),
            content,
        }
    }
}

/// Reply envelope produced in dispatch mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Action that produced the response, or [`ERROR_ACTION`] on failure.
    pub action: String,
    /// Handler output or error message.
    pub response: Value,
}

impl ActionResponse {
    /// Builds a successful reply for `action`.
    #[must_use]
    pub fn success(action: impl Into<String>, response: Value) -> Self {
        Self {
            action: action.into(),
            response,
        }
    }

    /// Builds a failure reply carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            action: ERROR_ACTION.to_owned(),
            response: Value::String(message.into()),
        }
    }

    /// Reports whether this is a failure envelope.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.action == ERROR_ACTION
    }
}
