//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Key the session token is stored under in secure storage.
pub const DEFAULT_TOKEN_KEY: &str = "token";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request `uri` is joined onto.
    pub base_url: String,
    /// Per-request timeout applied by the HTTP transport.
    pub request_timeout: Duration,
    /// Secure storage key for the session token.
    pub token_key: String,
    /// Directory backing the file secure store.
    pub store_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            store_dir: default_store_dir(),
        }
    }
}

impl ClientConfig {
    /// Build configuration from `EVIA_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = std::env::var("EVIA_API_BASE_URL").unwrap_or(defaults.base_url);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "EVIA_API_BASE_URL".into(),
                message: format!("expected an http(s) URL, got {base_url:?}"),
            });
        }

        let request_timeout = std::env::var("EVIA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let token_key = std::env::var("EVIA_TOKEN_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.token_key);

        let store_dir = std::env::var("EVIA_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            token_key,
            store_dir,
        })
    }
}

fn default_store_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".evia/secure")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.token_key, "token");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.store_dir.ends_with(".evia/secure"));
    }
}
