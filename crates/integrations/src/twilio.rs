//! Minimal Twilio Messaging client.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::secrets::Secrets;

const DEFAULT_TWILIO_API_URL: &str = "https://api.twilio.com";

/// Errors from the Twilio API.
#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twilio not configured: {0} is not set")]
    NotConfigured(String),

    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Sends SMS through Twilio's REST API.
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioClient {
    /// Create a client with explicit credentials.
    #[must_use]
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_TWILIO_API_URL.to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }

    /// Create a client from `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, and
    /// `TWILIO_FROM_NUMBER`.
    ///
    /// # Errors
    /// Returns [`TwilioError::NotConfigured`] naming the first missing variable.
    pub fn from_secrets(secrets: &Secrets) -> Result<Self, TwilioError> {
        let get = |name: &str| {
            secrets
                .get(name)
                .ok_or_else(|| TwilioError::NotConfigured(name.to_string()))
        };
        Ok(Self::new(
            get("TWILIO_ACCOUNT_SID")?,
            get("TWILIO_AUTH_TOKEN")?,
            get("TWILIO_FROM_NUMBER")?,
        ))
    }

    /// Override the API root (for tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a text message and return its SID.
    ///
    /// # Errors
    /// Returns an error when the request fails or Twilio rejects the message.
    #[instrument(skip_all, fields(to = %to))]
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<String, TwilioError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        );

        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(TwilioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let message: MessageResponse = response.json().await?;
        info!(sid = %message.sid, "SMS sent");
        Ok(message.sid)
    }
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .finish_non_exhaustive()
    }
}
