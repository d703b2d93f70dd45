//! Linear actions.
//!
//! Each handler turns validated arguments into exactly one GraphQL call and
//! maps the payload into the normalized types from `taskbridge_core`.

pub mod comment;
pub mod get;
pub mod search;
pub mod update;

use std::sync::Arc;

use taskbridge_core::{create_action, Registry, Result};

use crate::context::LinearContext;

/// Register every Linear action on `registry`, in discovery order.
pub fn register_actions(registry: &mut Registry, ctx: Arc<LinearContext>) -> Result<()> {
    registry.register(create_action(search::meta(), ctx.clone(), search::search_issues))?;
    registry.register(create_action(get::meta(), ctx.clone(), get::get_issue))?;
    registry.register(create_action(update::meta(), ctx.clone(), update::update_issue))?;
    registry.register(create_action(comment::meta(), ctx, comment::add_comment))?;
    Ok(())
}

/// Registry holding only the Linear actions.
pub fn build_registry(ctx: Arc<LinearContext>) -> Result<Registry> {
    let mut registry = Registry::new();
    register_actions(&mut registry, ctx)?;
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use taskbridge_core::{CallEnvelope, HttpEffect, ResponseEnvelope};

    use super::build_registry;
    use crate::context::{LinearContext, LinearSettings};

    pub const URL: &str = "https://linear.test/graphql";

    pub fn context(http: Arc<dyn HttpEffect>) -> Arc<LinearContext> {
        Arc::new(LinearContext::new(
            http,
            LinearSettings::new("lin_api_test").with_api_url(URL),
        ))
    }

    /// Dispatch one call through a fresh registry backed by `http`.
    pub async fn dispatch(http: Arc<dyn HttpEffect>, name: &str, args: Value) -> ResponseEnvelope {
        let registry = build_registry(context(http)).unwrap();
        registry.dispatch(CallEnvelope::new(name, args)).await
    }

    pub fn issue_node(identifier: &str) -> Value {
        json!({
            "id": format!("uuid-{}", identifier),
            "identifier": identifier,
            "title": "Login fails on mobile",
            "description": "Steps to reproduce...",
            "state": {"name": "Todo"},
            "priority": 2,
            "assignee": {"name": "jdoe", "displayName": "Jane Doe"},
            "labels": {"nodes": [{"name": "bug"}]},
            "url": format!("https://linear.app/acme/issue/{}", identifier),
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-02T10:00:00.000Z"
        })
    }
}
