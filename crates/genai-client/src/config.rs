//! Client configuration.

use std::time::Duration;

use crate::error::ClientError;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "GENAI_API_URL";

/// Environment variable overriding the per-request timeout in seconds.
pub const TIMEOUT_ENV: &str = "GENAI_TIMEOUT_SECS";

/// API client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the platform API, without the `/api/v1` prefix.
    pub base_url: String,

    /// Timeout applied to every individual request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `GENAI_API_URL` and `GENAI_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config = config.with_base_url(url);
            }
        }

        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ClientError::InvalidInput(format!("{TIMEOUT_ENV} must be a whole number of seconds"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Builder method to set the base URL. Trailing slashes are dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder method to set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
