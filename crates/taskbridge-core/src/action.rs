//! Schema-validated actions.
//!
//! An action is a named operation with a description, an input [`Schema`]
//! and a handler. [`create_action`] binds a handler to its context once at
//! startup; [`Action::execute`] then validates raw arguments, deserializes
//! them into the handler's typed argument struct and runs the handler.
//!
//! Handlers are plain async functions:
//!
//! ```ignore
//! async fn search(ctx: Arc<MyContext>, args: SearchArgs) -> Result<SearchResults> { ... }
//!
//! let action = create_action(
//!     ActionMeta::new("search", "Search things", schema),
//!     context.clone(),
//!     search,
//! );
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::envelope::{codes, ResponseEnvelope};
use crate::schema::{FieldError, Schema};
use crate::Error;

/// Static description of an action.
#[derive(Debug, Clone)]
pub struct ActionMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Schema,
}

impl ActionMeta {
    pub fn new(name: &'static str, description: &'static str, input_schema: Schema) -> Self {
        Self {
            name,
            description,
            input_schema,
        }
    }
}

/// Failure surfaced by [`Action::execute`].
#[derive(Error, Debug)]
pub enum ActionError {
    /// Arguments did not match the schema; the caller should fix the call
    #[error("Invalid arguments: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Handler or one of its effects failed
    #[error(transparent)]
    Handler(#[from] Error),
}

impl ActionError {
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::Validation(_) => codes::VALIDATION_ERROR,
            ActionError::Handler(e) => e.code(),
        }
    }
}

impl From<ActionError> for ResponseEnvelope {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Validation(errors) => ResponseEnvelope::validation(errors),
            ActionError::Handler(e) => ResponseEnvelope::failure(e.to_string(), e.code()),
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Type-erased action as stored in a registry.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> &Schema;

    /// Validate `raw_args` and run the handler.
    ///
    /// Validation failures come back as [`ActionError::Validation`] with
    /// every problem listed; the handler is not called in that case.
    async fn execute(&self, raw_args: Value) -> Result<Value, ActionError>;
}

/// Action backed by an async handler function.
pub struct FnAction<C, A, R, F> {
    meta: ActionMeta,
    context: Arc<C>,
    handler: F,
    _types: PhantomData<fn(A) -> R>,
}

/// Bind `handler` to `context` under `meta`.
pub fn create_action<C, A, R, F, Fut>(
    meta: ActionMeta,
    context: Arc<C>,
    handler: F,
) -> FnAction<C, A, R, F>
where
    C: Send + Sync + 'static,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(Arc<C>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Result<R>> + Send + 'static,
{
    FnAction {
        meta,
        context,
        handler,
        _types: PhantomData,
    }
}

impl<C, A, R, F> fmt::Debug for FnAction<C, A, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.meta.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C, A, R, F, Fut> Action for FnAction<C, A, R, F>
where
    C: Send + Sync + 'static,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(Arc<C>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Result<R>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.meta.name
    }

    fn description(&self) -> &str {
        self.meta.description
    }

    fn input_schema(&self) -> &Schema {
        &self.meta.input_schema
    }

    async fn execute(&self, raw_args: Value) -> Result<Value, ActionError> {
        let normalized = self
            .meta
            .input_schema
            .validate(&raw_args)
            .map_err(ActionError::Validation)?;

        // Schema and argument struct disagreeing is still a caller-facing validation error
        let args: A = serde_json::from_value(Value::Object(normalized))
            .map_err(|e| ActionError::Validation(vec![FieldError::new("$", e.to_string())]))?;

        let output = (self.handler)(Arc::clone(&self.context), args).await?;

        serde_json::to_value(output).map_err(|e| ActionError::Handler(Error::Serialization(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        calls: AtomicUsize,
        prefix: String,
    }

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
        times: u32,
    }

    async fn echo(ctx: Arc<Counter>, args: EchoArgs) -> crate::Result<Value> {
        ctx.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "echo": format!("{}{}", ctx.prefix, args.text.repeat(args.times as usize)) }))
    }

    async fn fail(_ctx: Arc<Counter>, _args: EchoArgs) -> crate::Result<Value> {
        Err(Error::NotFound("issue X-1".into()))
    }

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::string("text").required())
            .field(FieldSpec::integer("times").range(1, 5).default_value(json!(1)))
    }

    fn context() -> Arc<Counter> {
        Arc::new(Counter {
            calls: AtomicUsize::new(0),
            prefix: ">".into(),
        })
    }

    #[tokio::test]
    async fn test_execute_valid_args() {
        let ctx = context();
        let action = create_action(ActionMeta::new("echo", "Echo text", schema()), ctx.clone(), echo);

        let out = action.execute(json!({"text": "ab", "times": 2})).await.unwrap();

        assert_eq!(out, json!({"echo": ">abab"}));
        assert_eq!(ctx.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_applies_defaults() {
        let action = create_action(ActionMeta::new("echo", "Echo text", schema()), context(), echo);
        let out = action.execute(json!({"text": "ab"})).await.unwrap();
        assert_eq!(out, json!({"echo": ">ab"}));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_handler() {
        let ctx = context();
        let action = create_action(ActionMeta::new("echo", "Echo text", schema()), ctx.clone(), echo);

        let err = action.execute(json!({"times": 9})).await.unwrap_err();

        match &err {
            ActionError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].path, "text");
                assert_eq!(errors[1].path, "times");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(ctx.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let action = create_action(ActionMeta::new("fail", "Always fails", schema()), context(), fail);

        let err = action.execute(json!({"text": "x"})).await.unwrap_err();

        assert!(matches!(err, ActionError::Handler(Error::NotFound(_))));
        assert_eq!(err.code(), "NOT_FOUND");

        let envelope: ResponseEnvelope = err.into();
        assert_eq!(envelope.code(), Some("NOT_FOUND"));
        assert_eq!(envelope.error().unwrap().message, "Not found: issue X-1");
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let action = create_action(
            ActionMeta::new("len", "Length of text", schema()),
            context(),
            |_ctx, args: EchoArgs| async move { Ok(args.text.len()) },
        );

        assert_eq!(action.name(), "len");
        assert_eq!(action.description(), "Length of text");
        assert_eq!(action.execute(json!({"text": "four"})).await.unwrap(), json!(4));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ActionError::Validation(vec![
            FieldError::new("a", "is required"),
            FieldError::new("b", "expected string, got integer"),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid arguments: a: is required; b: expected string, got integer"
        );
    }
}
