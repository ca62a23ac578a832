//! Runner configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Invalid runner settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("attempt_timeout must be greater than zero")]
    ZeroTimeout,
}

/// How a batch is executed.
///
/// Durations are expressed in milliseconds when (de)serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Maximum number of checks in flight.
    pub concurrency: usize,
    /// Pause between two consecutive launches.
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    /// Attempts per check, the first one included.
    pub max_attempts: u32,
    /// Base wait before a retry; multiplied by the attempt number.
    #[serde(rename = "retry_backoff_ms", with = "millis")]
    pub retry_backoff: Duration,
    /// Upper bound for a single attempt.
    #[serde(rename = "attempt_timeout_ms", with = "millis")]
    pub attempt_timeout: Duration,
    /// Stop launching new checks after the first final failure.
    pub halt_on_failure: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            delay: Duration::ZERO,
            max_attempts: 1,
            retry_backoff: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(30),
            halt_on_failure: false,
        }
    }
}

impl RunnerConfig {
    /// Reject settings the runner cannot honor.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
