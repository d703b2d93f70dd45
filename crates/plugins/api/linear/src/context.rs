//! Shared context for Linear actions and the GraphQL call they all make.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use taskbridge_core::config::DEFAULT_LINEAR_API_URL;
use taskbridge_core::{Error, HttpEffect, RequestOptions, Result};
use tracing::{debug, warn};

use crate::types::{GraphQlRequest, GraphQlResponse};

/// Credentials and endpoint for the Linear API.
#[derive(Clone, PartialEq, Eq)]
pub struct LinearSettings {
    pub api_key: String,
    pub api_url: String,
}

impl LinearSettings {
    /// Settings for the public Linear endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_LINEAR_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

impl fmt::Debug for LinearSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearSettings")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Everything a Linear handler needs. Built once, shared by `Arc`.
pub struct LinearContext {
    pub http: Arc<dyn HttpEffect>,
    pub settings: LinearSettings,
}

impl LinearContext {
    pub fn new(http: Arc<dyn HttpEffect>, settings: LinearSettings) -> Self {
        Self { http, settings }
    }

    /// Run one GraphQL operation and return its `data`.
    ///
    /// Non-2xx statuses map through [`Error::from_status`]; a non-empty
    /// `errors` array is [`Error::GraphQl`]; a missing `data` is
    /// [`Error::InvalidData`].
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let body = serde_json::to_value(GraphQlRequest { query, variables })?;
        let options = RequestOptions::post_json(&body)
            .header("Authorization", self.settings.api_key.as_str());

        debug!(operation = operation, url = %self.settings.api_url, "Linear GraphQL request");

        let response = self.http.perform(&self.settings.api_url, options).await?;

        if !response.is_success() {
            warn!(
                operation = operation,
                status = response.status,
                "Linear API error response"
            );
            return Err(Error::from_status(
                response.status,
                response.text().to_string(),
            ));
        }

        let payload: GraphQlResponse<T> = response.json()?;

        if !payload.errors.is_empty() {
            let message = payload
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(operation = operation, error = %message, "Linear GraphQL errors");
            return Err(Error::GraphQl(message));
        }

        payload.data.ok_or_else(|| {
            Error::InvalidData(format!("{}: response contained no data", operation))
        })
    }
}

impl fmt::Debug for LinearContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use taskbridge_core::{HttpMethod, HttpResponse, InMemoryHttp};

    const URL: &str = "https://linear.test/graphql";

    #[derive(Debug, Deserialize)]
    struct Viewer {
        viewer: ViewerNode,
    }

    #[derive(Debug, Deserialize)]
    struct ViewerNode {
        id: String,
    }

    fn context(http: InMemoryHttp) -> (Arc<InMemoryHttp>, LinearContext) {
        let http = Arc::new(http);
        let ctx = LinearContext::new(
            http.clone(),
            LinearSettings::new("lin_api_test").with_api_url(URL),
        );
        (http, ctx)
    }

    #[tokio::test]
    async fn test_request_shape() {
        let (http, ctx) = context(
            InMemoryHttp::new().on_json(URL, 200, json!({"data": {"viewer": {"id": "u1"}}})),
        );

        let data: Viewer = ctx
            .graphql("Viewer", "query Viewer { viewer { id } }", json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(data.viewer.id, "u1");

        let request = http.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.header("authorization"), Some("lin_api_test"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(
            request.json_body().unwrap(),
            json!({"query": "query Viewer { viewer { id } }", "variables": {"a": 1}})
        );
    }

    #[tokio::test]
    async fn test_status_errors_are_mapped() {
        let (_, ctx) = context(
            InMemoryHttp::new().on(URL, |_| HttpResponse::new(401, "Authentication required")),
        );

        let err = ctx
            .graphql::<Viewer>("Viewer", "query", json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized(ref m) if m == "Authentication required"));
    }

    #[tokio::test]
    async fn test_graphql_errors_are_joined() {
        let (_, ctx) = context(InMemoryHttp::new().on_json(
            URL,
            200,
            json!({"data": null, "errors": [{"message": "first"}, {"message": "second"}]}),
        ));

        let err = ctx
            .graphql::<Viewer>("Viewer", "query", json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GraphQl(ref m) if m == "first; second"));
        assert_eq!(err.code(), "API_ERROR");
    }

    #[tokio::test]
    async fn test_missing_data_is_invalid() {
        let (_, ctx) = context(InMemoryHttp::new().on_json(URL, 200, json!({})));

        let err = ctx
            .graphql::<Viewer>("Viewer", "query", json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid() {
        let (_, ctx) = context(InMemoryHttp::new().on(URL, |_| HttpResponse::new(200, "<html>")));

        let err = ctx
            .graphql::<Viewer>("Viewer", "query", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_DATA");
    }

    #[test]
    fn test_settings_debug_hides_key() {
        let settings = LinearSettings::new("lin_api_secret");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("lin_api_secret"));
        assert!(rendered.contains("api.linear.app"));
    }
}
