//! Error types for the Airtable client.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to Airtable.
#[derive(Debug, Error)]
pub enum AirtableError {
    /// HTTP transport error (connection, DNS, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Airtable answered with an error payload
    #[error("Airtable returned {status} ({kind}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Airtable error type, e.g. `INVALID_REQUEST_UNKNOWN`
        kind: String,
        /// Human-readable message
        message: String,
    },

    /// Table or record does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token rejected or lacks scope (401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by Airtable (429)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Wait time suggested by the `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// A required configuration variable is missing
    #[error("Airtable not configured: {0} is not set")]
    NotConfigured(String),

    /// Response body did not match the record API shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API root could not be turned into a request URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// API key contains characters not allowed in a header
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl AirtableError {
    /// Whether a caller could reasonably try the same request again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result alias for Airtable operations.
pub type Result<T> = std::result::Result<T, AirtableError>;
