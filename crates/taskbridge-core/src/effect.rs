//! Effect interfaces consumed by action handlers.
//!
//! Handlers never talk to the network directly. They receive an
//! [`HttpEffect`] through their context, and the binary decides which
//! implementation backs it:
//!
//! - the reqwest-backed client from the provider plugin in production;
//! - [`InMemoryHttp`] in tests, which answers from registered factories
//!   without doing any I/O.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

// =============================================================================
// Request / response values
// =============================================================================

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`HttpEffect::perform`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Defaults to `GET` when unset
    pub method: Option<HttpMethod>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RequestOptions {
    /// Options for a POST carrying a JSON body.
    pub fn post_json(body: &Value) -> Self {
        Self {
            method: Some(HttpMethod::Post),
            headers: BTreeMap::new(),
            body: Some(body.to_string()),
        }
        .header("Content-Type", "application/json")
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Effective method.
    pub fn method(&self) -> HttpMethod {
        self.method.unwrap_or_default()
    }
}

/// Response returned by an effect.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: BTreeMap<String, String>,
    body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Response with a JSON body and matching content type.
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    /// Default answer for requests nobody registered.
    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text.
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::InvalidData(format!("Failed to parse response body: {}", e)))
    }
}

// =============================================================================
// HttpEffect trait
// =============================================================================

/// Capability to perform one HTTP request.
///
/// Implementations own timeouts; nothing above this seam retries or caches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpEffect: Send + Sync {
    /// Send a request to `url` and return the raw response.
    ///
    /// Non-2xx statuses are returned as responses, not errors. Only
    /// transport failures (connect, timeout, ...) are `Err`.
    async fn perform(&self, url: &str, options: RequestOptions) -> Result<HttpResponse>;
}

// =============================================================================
// InMemoryHttp - deterministic fake for tests
// =============================================================================

/// A request captured by [`InMemoryHttp`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON, if any.
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Produces the response for a registered URL.
pub type ResponseFactory = Arc<dyn Fn(&RecordedRequest) -> HttpResponse + Send + Sync>;

/// In-memory [`HttpEffect`] keyed by exact URL.
///
/// ```ignore
/// let http = InMemoryHttp::new().on("https://api.example.com/graphql", |req| {
///     assert_eq!(req.method, HttpMethod::Post);
///     HttpResponse::json_body(200, &json!({"data": {}}))
/// });
/// ```
#[derive(Default)]
pub struct InMemoryHttp {
    routes: HashMap<String, ResponseFactory>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl InMemoryHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response factory for `url`.
    pub fn on<F>(mut self, url: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&RecordedRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.routes.insert(url.into(), Arc::new(factory));
        self
    }

    /// Register a fixed JSON answer for `url`.
    pub fn on_json(self, url: impl Into<String>, status: u16, body: Value) -> Self {
        self.on(url, move |_| HttpResponse::json_body(status, &body))
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of requests seen so far.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Most recent request, if any.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }
}

impl fmt::Debug for InMemoryHttp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryHttp")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl HttpEffect for InMemoryHttp {
    async fn perform(&self, url: &str, options: RequestOptions) -> Result<HttpResponse> {
        let request = RecordedRequest {
            url: url.to_string(),
            method: options.method(),
            headers: options.headers,
            body: options.body,
        };

        debug!(url = url, method = %request.method, "In-memory HTTP request");

        let response = match self.routes.get(url) {
            Some(factory) => factory(&request),
            None => HttpResponse::not_found(),
        };

        self.requests
            .lock()
            .map_err(|e| Error::Http(format!("Request log poisoned: {}", e)))?
            .push(request);

        Ok(response)
    }
}
