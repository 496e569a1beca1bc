//! Transport boundary — how a request actually reaches the server.
//!
//! The core only needs a single-result async call. `ReqwestTransport` is the
//! stock adapter; hosts and tests plug in their own `Transport`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};

use super::types::{ApiRequest, ApiResponse, HttpMethod};

/// A single-result asynchronous API call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// JSON-over-HTTP transport built on `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "http_client".into(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    fn url(&self, uri: &str) -> String {
        if uri.starts_with('/') {
            format!("{}{uri}", self.base_url)
        } else {
            format!("{}/{uri}", self.base_url)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.uri);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if request.method.has_body() {
            builder = builder.json(&request.data);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    uri: request.uri.clone(),
                    timeout: self.timeout,
                }
            } else {
                TransportError::Connect {
                    uri: request.uri.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse {
                uri: request.uri.clone(),
                reason: e.to_string(),
            })?;
        debug!(uri = %request.uri, status = status.as_u16(), "Response received");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        if body.trim().is_empty() {
            return Ok(ApiResponse::default());
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| TransportError::InvalidResponse {
                uri: request.uri.clone(),
                reason: e.to_string(),
            })?;
        Ok(ApiResponse::ok(value))
    }
}

/// Pull a displayable message out of an error body, falling back to the
/// status line.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_body = parsed.as_ref().and_then(|v| {
        ["message", "error", "errors"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    from_body.unwrap_or_else(|| {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown status");
        format!("Request failed ({status} {reason})")
    })
}
