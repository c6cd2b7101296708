//! Action dispatch for the JSON request mode.
//!
//! A dispatch request is a JSON object `{"action": <name>, "content": <any>}`.
//! The action is looked up in the [`ActionRegistry`] and its handler's output
//! is returned as `{"action": <name>, "response": <value>}`. Malformed
//! payloads, unknown actions and failing handlers all produce
//! `{"action": "error", "response": <message>}` instead.

mod errors;
mod handler;
mod registry;
mod request;

pub use self::errors::{DispatchError, HandlerError, RegistryError};
pub use self::handler::{ActionHandler, EchoAction};
pub use self::registry::{ActionRegistry, ECHO_ACTION, LIST_ACTIONS_ACTION};
pub use self::request::parse_request;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
