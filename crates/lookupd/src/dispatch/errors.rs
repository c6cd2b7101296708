//! Error types for action dispatch.
//!
//! Every variant here is isolated to the request that raised it: the session
//! turns it into an `{"action":"error"}` envelope and keeps serving.

use thiserror::Error;

/// Failures raised by an [`ActionHandler`](super::ActionHandler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler rejected its input.
    #[error("invalid content: {message}")]
    InvalidContent {
        /// Explanation returned to the client.
        message: String,
    },
    /// The handler failed while processing valid input.
    #[error("{message}")]
    Failed {
        /// Explanation returned to the client.
        message: String,
    },
    /// The handler panicked; the panic was contained.
    #[error("action '{action}' panicked: {message}")]
    Panicked {
        /// Action whose handler panicked.
        action: String,
        /// Panic payload rendered as text.
        message: String,
    },
}

impl HandlerError {
    /// Creates an invalid content error.
    #[must_use]
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Creates a generic handler failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub(crate) fn panicked(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Failures raised while mutating the action registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The action name was empty or whitespace.
    #[error("action name must not be empty")]
    EmptyName,
    /// The action name is reserved for failure envelopes.
    #[error("action name '{name}' is reserved")]
    Reserved {
        /// Rejected name.
        name: String,
    },
    /// A handler is already registered under this name.
    #[error("action '{name}' is already registered")]
    Duplicate {
        /// Rejected name.
        name: String,
    },
    /// A thread panicked while holding the registry lock.
    #[error("action registry lock poisoned")]
    Poisoned,
}

/// Failures raised while decoding or routing an action request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload is not JSON.
    #[error("Invalid JSON: {message}")]
    MalformedJson {
        /// Parser message.
        message: String,
        /// Underlying parser error, when one exists.
        #[source]
        source: Option<serde_json::Error>,
    },
    /// The payload is JSON but not an action request.
    #[error("Invalid request: {message}")]
    InvalidStructure {
        /// Explanation returned to the client.
        message: String,
    },
    /// No handler is registered for the requested action.
    #[error("Invalid action: {action}")]
    UnknownAction {
        /// Requested action name.
        action: String,
    },
    /// The resolved handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
    /// Registry state could not be read.
    #[error("internal error: {message}")]
    Internal {
        /// Explanation returned to the client.
        message: String,
    },
}

impl DispatchError {
    /// Classifies a serde error as either malformed JSON or a schema mismatch.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        if source.is_data() {
            Self::InvalidStructure {
                message: source.to_string(),
            }
        } else {
            Self::MalformedJson {
                message: source.to_string(),
                source: Some(source),
            }
        }
    }

    /// Creates a malformed JSON error with a custom message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJson {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid structure error.
    #[must_use]
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[must_use]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(error: RegistryError) -> Self {
        Self::internal(error.to_string())
    }
}
