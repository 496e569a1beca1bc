//! Request and response shapes at the HTTP boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Whether the request carries a JSON body.
    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Get | Self::Delete)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

/// A single API call: `{method, uri, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the configured base URL, e.g. `/auth/register`.
    pub uri: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, uri: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            method,
            uri: uri.into(),
            data,
        }
    }

    pub fn post(uri: impl Into<String>, data: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, uri, data)
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, uri, serde_json::Value::Null)
    }
}

/// What the transport hands back: a body on success or a display message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(format!("\"{method}\""), json);
        }
    }

    #[test]
    fn post_builder() {
        let req = ApiRequest::post("/auth/register", serde_json::json!({ "email": "a@b.com" }));
        assert_eq!(req.method, HttpMethod::Post);
        assert!(req.method.has_body());
        assert_eq!(req.uri, "/auth/register");
        assert!(!ApiRequest::get("/me").method.has_body());
    }
}
