//! Strategies that turn a request payload into a reply.

use lookup_protocol::{ActionResponse, SearchReply};
use tracing::{debug, error, warn};

use crate::dispatch::{ActionRegistry, parse_request};
use crate::store::DataStore;

use super::request::decode_query;
use super::{ProtocolError, SESSION_TARGET};

/// Produces the reply body for one request.
///
/// Implementations receive the request with trailing padding already
/// removed and return the reply without its frame terminator. They must not
/// fail: every error becomes a reply.
pub trait RequestResolver: Send + Sync + 'static {
    /// Resolves one request.
    fn resolve(&self, request: &[u8]) -> String;

    /// Reply sent when [`RequestResolver::resolve`] panicked.
    fn failure_reply(&self, message: &str) -> String;

    /// Reply sent instead of resolving a request the session refused.
    fn rejection_reply(&self, error: &ProtocolError) -> String;

    /// Whether the connection stays open for further requests.
    fn persistent(&self) -> bool {
        false
    }
}

/// Answers exact-line membership queries against a [`DataStore`].
///
/// One query per connection.
#[derive(Debug)]
pub struct SearchResolver {
    store: DataStore,
}

impl SearchResolver {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: DataStore) -> Self {
        Self { store }
    }

    fn lookup(&self, request: &[u8]) -> SearchReply {
        let query = match decode_query(request) {
            Ok(query) => query,
            Err(error) => {
                warn!(target: SESSION_TARGET, %error, "undecodable query");
                return SearchReply::InvalidRequest;
            }
        };
        match self.store.contains(query) {
            Ok(found) => {
                debug!(target: SESSION_TARGET, query, found, "query resolved");
                if found {
                    SearchReply::Exists
                } else {
                    SearchReply::NotFound
                }
            }
            Err(error) => {
                error!(target: SESSION_TARGET, %error, "corpus lookup failed");
                SearchReply::ServerError
            }
        }
    }
}

impl RequestResolver for SearchResolver {
    fn resolve(&self, request: &[u8]) -> String {
        self.lookup(request).as_str().to_owned()
    }

    fn failure_reply(&self, _message: &str) -> String {
        SearchReply::ServerError.as_str().to_owned()
    }

    fn rejection_reply(&self, _error: &ProtocolError) -> String {
        SearchReply::InvalidRequest.as_str().to_owned()
    }
}

/// Routes JSON action requests through an [`ActionRegistry`].
///
/// The connection stays open until the client closes it.
#[derive(Debug, Clone)]
pub struct DispatchResolver {
    registry: ActionRegistry,
}

impl DispatchResolver {
    /// Wraps `registry`.
    #[must_use]
    pub const fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }
}

impl RequestResolver for DispatchResolver {
    fn resolve(&self, request: &[u8]) -> String {
        let response = parse_request(request)
            .and_then(|parsed| {
                let value = self.registry.dispatch(&parsed)?;
                Ok(ActionResponse::success(parsed.action.trim(), value))
            })
            .unwrap_or_else(|error| {
                warn!(target: SESSION_TARGET, %error, "action request failed");
                ActionResponse::error(error.to_string())
            });
        encode(&response)
    }

    fn failure_reply(&self, message: &str) -> String {
        encode(&ActionResponse::error(message))
    }

    fn rejection_reply(&self, error: &ProtocolError) -> String {
        encode(&ActionResponse::error(error.to_string()))
    }

    fn persistent(&self) -> bool {
        true
    }
}

fn encode(response: &ActionResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        error!(target: SESSION_TARGET, %error, "failed to encode action response");
        r#"{"action":"error","response":"failed to encode response"}"#.to_owned()
    })
}
