//! Configuration for the Airtable client.

use std::env;
use std::time::Duration;

use crate::error::{AirtableError, Result};

/// Default Airtable API root.
pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

const ENV_API_KEY: &str = "AIRTABLE_API_KEY";
const ENV_BASE_ID: &str = "AIRTABLE_BASE_ID";
const ENV_API_URL: &str = "AIRTABLE_API_URL";
const ENV_TIMEOUT_SECS: &str = "AIRTABLE_TIMEOUT_SECS";
const ENV_MIN_INTERVAL_MS: &str = "AIRTABLE_MIN_INTERVAL_MS";

/// Airtable allows five requests per second per base.
const DEFAULT_MIN_INTERVAL_MS: u64 = 200;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Airtable connection settings.
#[derive(Clone)]
pub struct AirtableConfig {
    /// Personal access token.
    pub api_key: String,
    /// Base ID (`app...`).
    pub base_id: String,
    /// API root URL.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Minimum spacing between two requests from the same client.
    pub min_request_interval: Duration,
}

impl std::fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("min_request_interval", &self.min_request_interval)
            .finish()
    }
}

impl AirtableConfig {
    /// Create a config with default URL, timeout, and pacing.
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_id: base_id.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_request_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
        }
    }

    /// Load the config from environment variables.
    ///
    /// # Errors
    /// Returns [`AirtableError::NotConfigured`] when `AIRTABLE_API_KEY` or
    /// `AIRTABLE_BASE_ID` is missing or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the config through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Same as [`AirtableConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AirtableError::NotConfigured(name.to_string()))
        };

        let mut config = Self::new(required(ENV_API_KEY)?, required(ENV_BASE_ID)?);

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            config.api_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|s| s.parse().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = lookup(ENV_MIN_INTERVAL_MS).and_then(|s| s.parse().ok()) {
            config.min_request_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Override the API root (used against mock servers).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the request pacing.
    #[must_use]
    pub const fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
