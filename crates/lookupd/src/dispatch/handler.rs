//! The typed handler interface and the built-in actions.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

use super::HandlerError;

/// Callable registered under an action name.
///
/// Handlers receive the request `content` verbatim and return the value sent
/// back as `response`. They run on session worker threads and must be
/// shareable between them. A panicking handler is contained and reported as
/// [`HandlerError::Panicked`].
pub trait ActionHandler: Send + Sync + 'static {
    /// Produces the response for one request.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] that is relayed to the client.
    fn call(&self, content: &Value) -> Result<Value, HandlerError>;
}

impl<F> ActionHandler for F
where
    F: Fn(&Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    fn call(&self, content: &Value) -> Result<Value, HandlerError> {
        self(content)
    }
}

pub(super) type HandlerTable = RwLock<BTreeMap<String, Arc<dyn ActionHandler>>>;

/// Returns the request content unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAction;

impl ActionHandler for EchoAction {
    fn call(&self, content: &Value) -> Result<Value, HandlerError> {
        Ok(content.clone())
    }
}

/// Lists the registered action names in sorted order.
pub(super) struct ListActions {
    table: Weak<HandlerTable>,
}

impl ListActions {
    pub(super) fn new(table: &Arc<HandlerTable>) -> Self {
        Self {
            table: Arc::downgrade(table),
        }
    }
}

impl ActionHandler for ListActions {
    fn call(&self, _content: &Value) -> Result<Value, HandlerError> {
        let table = self
            .table
            .upgrade()
            .ok_or_else(|| HandlerError::failed("action registry is gone"))?;
        let names = table
            .read()
            .map_err(|_| HandlerError::failed("action registry lock poisoned"))?
            .keys()
            .cloned()
            .map(Value::String)
            .collect();
        Ok(Value::Array(names))
    }
}
