//! Name-to-handler mapping shared by all sessions.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use lookup_protocol::{ActionRequest, ERROR_ACTION};
use serde_json::Value;
use tracing::{debug, error};

use super::handler::{EchoAction, HandlerTable, ListActions};
use super::{ActionHandler, DISPATCH_TARGET, DispatchError, HandlerError, RegistryError};
use crate::panics::describe_panic;

/// Name of the built-in echo action.
pub const ECHO_ACTION: &str = "echo";
/// Name of the built-in action that lists registered names.
pub const LIST_ACTIONS_ACTION: &str = "list_actions";

/// Registry of action handlers.
///
/// Handlers may be registered and unregistered while sessions are resolving
/// requests. Lookups take a read lock only long enough to clone the handler
/// out; handlers run without any lock held.
///
/// Names are case-sensitive and compared after trimming surrounding
/// whitespace. Duplicate registrations are rejected, and `error` is reserved.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: Arc<HandlerTable>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the `echo` and `list_actions` actions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let list = ListActions::new(&registry.handlers);
        if let Ok(mut table) = registry.handlers.write() {
            table.insert(ECHO_ACTION.to_owned(), Arc::new(EchoAction));
            table.insert(LIST_ACTIONS_ACTION.to_owned(), Arc::new(list));
        }
        registry
    }

    /// Registers `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for empty, reserved or duplicate names.
    pub fn register<H>(&self, name: &str, handler: H) -> Result<(), RegistryError>
    where
        H: ActionHandler,
    {
        let key = validate_name(name)?;
        let mut table = self.handlers.write().map_err(|_| RegistryError::Poisoned)?;
        if table.contains_key(key) {
            return Err(RegistryError::Duplicate {
                name: key.to_owned(),
            });
        }
        table.insert(key.to_owned(), Arc::new(handler));
        debug!(target: DISPATCH_TARGET, action = key, "action registered");
        Ok(())
    }

    /// Removes the handler registered under `name`.
    ///
    /// Returns `true` when a handler was removed. Requests already holding
    /// the handler finish normally.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the registry lock is poisoned.
    pub fn unregister(&self, name: &str) -> Result<bool, RegistryError> {
        let mut table = self.handlers.write().map_err(|_| RegistryError::Poisoned)?;
        let removed = table.remove(name.trim()).is_some();
        if removed {
            debug!(target: DISPATCH_TARGET, action = name.trim(), "action unregistered");
        }
        Ok(removed)
    }

    /// Looks up the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownAction`] when nothing is registered
    /// under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ActionHandler>, DispatchError> {
        let table = self
            .handlers
            .read()
            .map_err(|_| DispatchError::internal("action registry lock poisoned"))?;
        table
            .get(name.trim())
            .cloned()
            .ok_or_else(|| DispatchError::unknown_action(name.trim()))
    }

    /// Returns the registered names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the registry lock is poisoned.
    pub fn names(&self) -> Result<Vec<String>, RegistryError> {
        let table = self.handlers.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(table.keys().cloned().collect())
    }

    /// Resolves `request.action` and runs its handler on `request.content`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownAction`] for unregistered actions and
    /// [`DispatchError::Handler`] when the handler fails or panics.
    pub fn dispatch(&self, request: &ActionRequest) -> Result<Value, DispatchError> {
        let action = request.action.trim();
        let handler = self.resolve(action)?;
        match panic::catch_unwind(AssertUnwindSafe(|| handler.call(&request.content))) {
            Ok(result) => result.map_err(DispatchError::from),
            Err(payload) => {
                let message = describe_panic(payload.as_ref());
                error!(
                    target: DISPATCH_TARGET,
                    action,
                    panic = %message,
                    "action handler panicked"
                );
                Err(HandlerError::panicked(action, message).into())
            }
        }
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.names().unwrap_or_default();
        f.debug_struct("ActionRegistry")
            .field("actions", &names)
            .finish()
    }
}

fn validate_name(name: &str) -> Result<&str, RegistryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::EmptyName);
    }
    if trimmed == ERROR_ACTION {
        return Err(RegistryError::Reserved {
            name: trimmed.to_owned(),
        });
    }
    Ok(trimmed)
}
