use thiserror::Error;

/// Why a message did not reach a channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The variable that would configure the channel is unset
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid webhook URL: {0}")]
    InvalidWebhook(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Webhook answered with a non-success status
    #[error("Webhook rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl ChannelError {
    /// Whether sending the same message again later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::NotConfigured(_) | Self::InvalidWebhook(_) | Self::Serialization(_) => false,
        }
    }
}
