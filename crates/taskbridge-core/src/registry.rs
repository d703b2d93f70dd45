//! Action registry and dispatcher.
//!
//! The registry is built once at startup and is read-only afterwards, so a
//! single instance can be shared (`Arc<Registry>`) by concurrent dispatches.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::envelope::{CallEnvelope, ResponseEnvelope};
use crate::{Error, Result};

/// Discovery entry for one registered action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Discovery response: `{ "operations": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub operations: Vec<OperationDescriptor>,
}

/// Maps operation names to actions.
#[derive(Default)]
pub struct Registry {
    actions: Vec<Arc<dyn Action>>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under its name. Duplicate names are rejected.
    pub fn register(&mut self, action: impl Action + 'static) -> Result<()> {
        self.register_arc(Arc::new(action))
    }

    /// Register an already shared action.
    pub fn register_arc(&mut self, action: Arc<dyn Action>) -> Result<()> {
        let name = action.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateAction(name));
        }

        debug!(action = %name, "Registering action");
        self.index.insert(name, self.actions.len());
        self.actions.push(action);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, action: impl Action + 'static) -> Result<Self> {
        self.register(action)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.index.get(name).map(|&i| &self.actions[i])
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Describe every registered action, in registration order.
    pub fn list(&self) -> Vec<OperationDescriptor> {
        self.actions
            .iter()
            .map(|a| OperationDescriptor {
                name: a.name().to_string(),
                description: a.description().to_string(),
                input_schema: a.input_schema().to_json_schema(),
            })
            .collect()
    }

    pub fn discovery(&self) -> Discovery {
        Discovery {
            operations: self.list(),
        }
    }

    /// Route `call` to its action and wrap the outcome.
    ///
    /// Never fails: every outcome, including an unknown name, is a
    /// [`ResponseEnvelope`].
    pub async fn dispatch(&self, call: CallEnvelope) -> ResponseEnvelope {
        let Some(action) = self.get(&call.name) else {
            warn!(operation = %call.name, "Unknown operation");
            return ResponseEnvelope::unknown_operation(&call.name);
        };

        info!(operation = %call.name, "Dispatching");

        match action.execute(call.args).await {
            Ok(result) => {
                debug!(operation = %call.name, "Operation succeeded");
                ResponseEnvelope::success(result)
            }
            Err(e) => {
                warn!(operation = %call.name, code = e.code(), error = %e, "Operation failed");
                e.into()
            }
        }
    }

    /// Parse an untyped call envelope, then dispatch it.
    pub async fn dispatch_value(&self, raw: Value) -> ResponseEnvelope {
        match CallEnvelope::from_value(raw) {
            Ok(call) => self.dispatch(call).await,
            Err(errors) => {
                warn!(errors = errors.len(), "Rejected call envelope");
                ResponseEnvelope::validation(errors)
            }
        }
    }

    /// Dispatch `call` unless `cancelled` resolves first.
    ///
    /// On cancellation the in-flight handler future (and its effect call) is
    /// dropped and a `CANCELLED` envelope is returned.
    pub async fn dispatch_until<F>(&self, call: CallEnvelope, cancelled: F) -> ResponseEnvelope
    where
        F: Future<Output = ()>,
    {
        let name = call.name.clone();
        tokio::select! {
            response = self.dispatch(call) => response,
            _ = cancelled => {
                info!(operation = %name, "Operation cancelled");
                ResponseEnvelope::cancelled(&name)
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("actions", &self.names())
            .finish()
    }
}
