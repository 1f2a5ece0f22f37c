//! Client configuration.
//!
//! `ClientConfig` deserializes from any serde source with every field
//! defaulted, so an embedding application can keep it in its own config file
//! and only override what it needs.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Errors that can occur when validating configuration or building the
/// HTTP client from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Failed to build HTTP client: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root; `/users/` is appended to it.
    pub base_url: String,
    /// Whole-request timeout enforced by the transport.
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - `base_url` is an absolute http(s) URL
    /// - `timeout_ms` is non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "base_url '{}' must start with http:// or https://",
                    self.base_url
                ),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
