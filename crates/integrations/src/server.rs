//! HTTP server for inbound YoBot webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use airtable::{AirtableClient, AirtableError};
use notify::{Notifier, NotifyEvent};

use crate::config::Config;
use crate::models::{count_by_type, HubSpotEvent, LeadRequest, VoiceBotCall, ZendeskWebhook};
use crate::twilio::TwilioClient;
use crate::webhooks::{
    verify_hubspot_signature, verify_zendesk_signature, HUBSPOT_SIGNATURE_HEADER,
    ZENDESK_SIGNATURE_HEADER, ZENDESK_TIMESTAMP_HEADER,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Airtable client; requests that log fail with 503 without it.
    pub airtable: Option<AirtableClient>,
    /// Slack notifier.
    pub notifier: Arc<Notifier>,
    /// Twilio client for lead confirmations.
    pub twilio: Option<TwilioClient>,
}

/// Build the HTTP router for the webhook service.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/zendesk-webhook", post(zendesk_webhook_handler))
        .route("/hubspot-webhook", post(hubspot_webhook_handler))
        .route("/lead-demo", post(lead_demo_handler))
        .route("/log-voicebot", post(voicebot_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler failures, rendered as `{"status": "error", "error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or failed validation (400)
    BadRequest(String),
    /// Missing or wrong signature (401)
    Unauthorized(&'static str),
    /// Airtable is not configured (503)
    Unavailable(String),
    /// Airtable rejected the write (502)
    Upstream(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(m) | Self::Unavailable(m) | Self::Upstream(m) => m,
            Self::Unauthorized(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "status": "error", "error": self.message() }));
        (self.status(), body).into_response()
    }
}

impl From<AirtableError> for ApiError {
    fn from(err: AirtableError) -> Self {
        match err {
            AirtableError::NotConfigured(_) => Self::Unavailable(err.to_string()),
            other => {
                error!(error = %other, "Airtable write failed");
                Self::Upstream(format!("Airtable write failed: {other}"))
            }
        }
    }
}

type HandlerResult = Result<Json<Value>, ApiError>;

fn airtable(state: &AppState) -> Result<&AirtableClient, ApiError> {
    state.airtable.as_ref().ok_or_else(|| {
        warn!("Airtable client not configured, rejecting request");
        ApiError::Unavailable("Airtable not configured".to_string())
    })
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Failed to parse webhook payload");
        ApiError::BadRequest(format!("invalid payload: {e}"))
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if state.airtable.is_none() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Log a Zendesk ticket to the support table.
///
/// The signature is checked only when `ZENDESK_WEBHOOK_SECRET` is set.
pub async fn zendesk_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult {
    if let Some(secret) = &state.config.zendesk_secret {
        let (Some(signature), Some(timestamp)) = (
            header(&headers, ZENDESK_SIGNATURE_HEADER),
            header(&headers, ZENDESK_TIMESTAMP_HEADER),
        ) else {
            warn!("Missing Zendesk signature headers");
            return Err(ApiError::Unauthorized("missing signature"));
        };

        if !verify_zendesk_signature(&body, timestamp, signature, secret) {
            warn!("Invalid Zendesk webhook signature");
            return Err(ApiError::Unauthorized("invalid signature"));
        }
        debug!("Zendesk signature verified");
    }

    let ticket = parse::<ZendeskWebhook>(&body)?.into_ticket();
    info!(ticket_id = %ticket.ticket_id, "Received Zendesk webhook");

    let client = airtable(&state)?;
    let record = client
        .log_event(&state.config.support_table, ticket.to_fields(Utc::now()))
        .await?;

    state.notifier.notify(NotifyEvent::WebhookReceived {
        source: "Zendesk".to_string(),
        summary: ticket.summary(),
        fields: ticket.slack_fields(),
        timestamp: Utc::now(),
    });

    Ok(Json(json!({ "status": "logged", "record_id": record.id })))
}

/// Log a batch of HubSpot events to the CRM table in one write.
pub async fn hubspot_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult {
    if let Some(secret) = &state.config.hubspot_secret {
        let Some(signature) = header(&headers, HUBSPOT_SIGNATURE_HEADER) else {
            warn!("Missing X-HubSpot-Signature header");
            return Err(ApiError::Unauthorized("missing signature"));
        };

        if !verify_hubspot_signature(&body, signature, secret) {
            warn!("Invalid HubSpot webhook signature");
            return Err(ApiError::Unauthorized("invalid signature"));
        }
        debug!("HubSpot signature verified");
    }

    let events: Vec<HubSpotEvent> = parse(&body)?;
    info!(count = events.len(), "Received HubSpot webhook");

    if events.is_empty() {
        return Ok(Json(json!({ "status": "ignored", "reason": "no events" })));
    }

    let client = airtable(&state)?;
    let now = Utc::now();
    let rows = events.iter().map(|e| e.to_fields(now)).collect();
    let records = client.create_records(&state.config.crm_table, rows).await?;

    state.notifier.notify(NotifyEvent::WebhookReceived {
        source: "HubSpot".to_string(),
        summary: format!("{} CRM event(s) logged", records.len()),
        fields: count_by_type(&events),
        timestamp: now,
    });

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    Ok(Json(json!({ "status": "logged", "record_ids": ids })))
}

/// Capture a demo request, notify Slack, and text the lead.
pub async fn lead_demo_handler(State(state): State<AppState>, body: Bytes) -> HandlerResult {
    let lead: LeadRequest = parse(&body)?;
    lead.validate().map_err(|e| {
        warn!(error = %e, "Rejected demo request");
        ApiError::BadRequest(e)
    })?;

    info!(name = %lead.name, company = ?lead.company, "Received demo request");

    let client = airtable(&state)?;
    let record = client
        .log_event(&state.config.leads_table, lead.to_fields(Utc::now()))
        .await?;

    state.notifier.notify(NotifyEvent::LeadCaptured {
        name: lead.name.trim().to_string(),
        email: lead.email.clone(),
        company: lead.company.clone(),
        source: lead.source.clone(),
        timestamp: Utc::now(),
    });

    let mut sms_sent = false;
    if let (true, Some(twilio), Some(phone)) = (state.config.lead_sms, &state.twilio, lead.phone())
    {
        let text = format!(
            "Hi {}, thanks for requesting a YoBot demo! We'll be in touch shortly.",
            lead.name.trim()
        );
        match twilio.send_sms(phone, &text).await {
            Ok(sid) => {
                debug!(sid = %sid, "Lead confirmation SMS sent");
                sms_sent = true;
            }
            Err(e) => warn!(error = %e, "Failed to send lead confirmation SMS"),
        }
    }

    Ok(Json(json!({
        "status": "logged",
        "record_id": record.id,
        "sms_sent": sms_sent
    })))
}

/// Log a voice-bot call summary.
pub async fn voicebot_handler(State(state): State<AppState>, body: Bytes) -> HandlerResult {
    let call: VoiceBotCall = parse(&body)?;
    call.validate().map_err(ApiError::BadRequest)?;

    info!(call_id = ?call.call_id, "Received voice-bot log");

    let client = airtable(&state)?;
    let record = client
        .log_event(&state.config.voicebot_table, call.to_fields(Utc::now()))
        .await?;

    let mut fields = std::collections::BTreeMap::new();
    if let Some(outcome) = &call.outcome {
        fields.insert("Outcome".to_string(), outcome.clone());
    }
    if let Some(secs) = call.duration_secs {
        fields.insert("Duration".to_string(), format!("{secs}s"));
    }
    state.notifier.notify(NotifyEvent::WebhookReceived {
        source: "VoiceBot".to_string(),
        summary: format!("Call from {}: {}", call.caller(), call.summary.trim()),
        fields,
        timestamp: Utc::now(),
    });

    Ok(Json(json!({ "status": "logged", "record_id": record.id })))
}
