//! reqwest-backed [`HttpEffect`].

use std::time::Duration;

use async_trait::async_trait;
use taskbridge_core::config::DEFAULT_TIMEOUT_SECS;
use taskbridge_core::{Error, HttpEffect, HttpMethod, HttpResponse, RequestOptions, Result};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("taskbridge/", env!("CARGO_PKG_VERSION"));

/// Production HTTP effect.
///
/// Every request is bounded by the client timeout; a timeout surfaces as
/// [`Error::Http`] like any other transport failure.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpEffect for ReqwestHttp {
    async fn perform(&self, url: &str, options: RequestOptions) -> Result<HttpResponse> {
        let method = options.method();
        debug!(url = url, method = %method, "HTTP request");

        let mut request = self.client.request(to_reqwest_method(method), url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = options.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url = url, "HTTP request timed out");
                Error::Http(format!("Request timed out: {}", e))
            } else {
                warn!(url = url, error = %e, "HTTP request failed");
                Error::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))?;

        debug!(url = url, status = status, "HTTP response");

        Ok(headers
            .into_iter()
            .fold(HttpResponse::new(status, body), |resp, (name, value)| {
                resp.with_header(name, value)
            }))
    }
}
