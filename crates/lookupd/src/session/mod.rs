//! Client sessions.
//!
//! A worker thread drives each accepted connection through the
//! [`SessionState`] machine. The [`RequestResolver`] chosen at startup
//! decides what a request means: [`SearchResolver`] answers one membership
//! query and closes, while [`DispatchResolver`] serves JSON action requests
//! until the client disconnects.
//!
//! Replies are terminated by a single newline. Failures never escape the
//! connection that raised them.

mod errors;
mod handler;
mod request;
mod resolver;
mod state;


pub use self::errors::{NetworkError, ProtocolError};
pub(crate) use self::handler::SessionHandler;
pub use self::handler::SessionLimits;
pub use self::request::{decode_query, trim_request};
pub use self::resolver::{DispatchResolver, RequestResolver, SearchResolver};
pub use self::state::SessionState;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
