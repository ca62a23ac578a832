//! Slack incoming-webhook channel.

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use super::blocks::BlockMessage;
use crate::error::ChannelError;
use crate::events::{NotifyEvent, Severity};
use crate::NotifyChannel;

/// Slack incoming webhook URL.
pub const ENV_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

/// Lowest severity posted to Slack (`info`, `warning`, `critical`).
pub const ENV_SLACK_MIN_SEVERITY: &str = "SLACK_MIN_SEVERITY";

/// Used when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Posts events to one Slack incoming webhook.
pub struct SlackChannel {
    webhook_url: Option<String>,
    min_severity: Severity,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Build from `SLACK_WEBHOOK_URL` and `SLACK_MIN_SEVERITY`.
    ///
    /// A blank URL leaves the channel unconfigured; an unparseable severity
    /// falls back to `info`.
    #[must_use]
    pub fn from_env() -> Self {
        let webhook_url = std::env::var(ENV_SLACK_WEBHOOK_URL)
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let min_severity = match std::env::var(ENV_SLACK_MIN_SEVERITY) {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                warn!(error = %e, var = ENV_SLACK_MIN_SEVERITY, "Ignoring invalid minimum severity");
                Severity::Info
            }),
            Err(_) => Severity::Info,
        };

        debug!(
            configured = webhook_url.is_some(),
            min_severity = %min_severity,
            "Slack channel loaded from environment"
        );

        Self {
            webhook_url,
            min_severity,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(webhook_url.into()),
            min_severity: Severity::Info,
            client: reqwest::Client::new(),
        }
    }

    /// Drop events quieter than `severity`.
    #[must_use]
    pub const fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Check that a webhook URL looks usable without sending anything.
    ///
    /// # Errors
    /// [`ChannelError::InvalidWebhook`] unless the URL is http(s) with a host.
    pub fn validate_webhook_url(url: &str) -> Result<(), ChannelError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| ChannelError::InvalidWebhook(e.to_string()))?;
        if matches!(parsed.scheme(), "https" | "http") && parsed.host_str().is_some() {
            Ok(())
        } else {
            Err(ChannelError::InvalidWebhook(format!(
                "unsupported scheme or missing host: {}",
                parsed.scheme()
            )))
        }
    }

    /// Post a bare `{"text": ...}` message.
    ///
    /// # Errors
    /// Fails when the channel is unconfigured or Slack rejects the message.
    pub async fn post_text(&self, text: &str) -> Result<(), ChannelError> {
        #[derive(Serialize)]
        struct Plain<'a> {
            text: &'a str,
        }

        self.deliver(&Plain { text }).await
    }

    async fn deliver<P: Serialize + Sync>(&self, payload: &P) -> Result<(), ChannelError> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_SLACK_WEBHOOK_URL.to_string()))?;

        let response = self.client.post(url).json(payload).send().await?;
        into_result(response).await
    }
}

async fn into_result(response: Response) -> Result<(), ChannelError> {
    let status = response.status();
    if status.is_success() {
        debug!(channel = "slack", "Slack accepted the message");
        return Ok(());
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        warn!(channel = "slack", retry_after_secs, "Slack rate limited the webhook");
        return Err(ChannelError::RateLimited { retry_after_secs });
    }

    let body = response.text().await.unwrap_or_default();
    warn!(channel = "slack", status = %status, body = %body, "Slack rejected the message");
    Err(ChannelError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError> {
        debug!(channel = "slack", title = %event.title(), "Posting event");
        self.deliver(&BlockMessage::from(event)).await
    }
}
