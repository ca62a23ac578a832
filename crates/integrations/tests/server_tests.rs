//! Webhook routes end to end, with Airtable, Slack, and Twilio mocked.

use std::sync::Arc;
use std::time::Duration;

use airtable::{AirtableClient, AirtableConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use integrations::config::DEFAULT_MAX_BODY_BYTES;
use integrations::server::{build_router, AppState};
use integrations::webhooks::{sign_hubspot, sign_zendesk};
use integrations::{Config, TwilioClient};
use notify::{Notifier, NotifyChannel, SlackChannel};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Helpers
// ============================================================================

fn config() -> Config {
    Config {
        port: 0,
        leads_table: "Leads".to_string(),
        support_table: "Support Tickets".to_string(),
        crm_table: "CRM Events".to_string(),
        voicebot_table: "VoiceBot Logs".to_string(),
        zendesk_secret: None,
        hubspot_secret: None,
        max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        lead_sms: true,
    }
}

fn airtable(server: &MockServer) -> AirtableClient {
    let config = AirtableConfig::new("pat-test", "appYOBOT")
        .with_api_url(server.uri())
        .with_timeout(Duration::from_secs(5))
        .with_min_request_interval(Duration::ZERO);
    AirtableClient::new(config).unwrap()
}

fn state(config: Config, server: Option<&MockServer>) -> AppState {
    AppState {
        config,
        airtable: server.map(airtable),
        notifier: Arc::new(Notifier::disabled()),
        twilio: None,
    }
}

fn created(id: &str) -> Value {
    json!({ "id": id, "createdTime": "2024-05-01T10:00:00.000Z", "fields": {} })
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let server = MockServer::start().await;

    let (status, body) = send(
        build_router(state(config(), None)),
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(
        build_router(state(config(), None)),
        Request::get("/ready").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        build_router(state(config(), Some(&server))),
        Request::get("/ready").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Zendesk
// ============================================================================

#[tokio::test]
async fn test_zendesk_logs_ticket() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appYOBOT/Support%20Tickets"))
        .and(body_partial_json(json!({
            "fields": { "Ticket ID": "42", "Subject": "Login broken", "Priority": "high" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(created("recZD")))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({ "ticket": { "id": 42, "subject": "Login broken", "priority": "high" } });
    let (status, body) = send(
        build_router(state(config(), Some(&server))),
        post("/zendesk-webhook", payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "logged", "record_id": "recZD" }));
}

#[tokio::test]
async fn test_zendesk_signature_required_when_secret_set() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(created("recZD")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config();
    config.zendesk_secret = Some("zd-secret".to_string());
    let payload = json!({ "id": 7, "subject": "Refund" }).to_string();

    // No headers
    let (status, _) = send(
        build_router(state(config.clone(), Some(&server))),
        post("/zendesk-webhook", payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Wrong secret
    let ts = "2024-05-01T10:00:00Z";
    let mut request = post("/zendesk-webhook", payload.clone());
    let headers = request.headers_mut();
    headers.insert("x-zendesk-webhook-signature-timestamp", ts.parse().unwrap());
    headers.insert(
        "x-zendesk-webhook-signature",
        sign_zendesk(payload.as_bytes(), ts, "wrong").parse().unwrap(),
    );
    let (status, body) = send(build_router(state(config.clone(), Some(&server))), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid signature");

    // Valid
    let mut request = post("/zendesk-webhook", payload.clone());
    let headers = request.headers_mut();
    headers.insert("x-zendesk-webhook-signature-timestamp", ts.parse().unwrap());
    headers.insert(
        "x-zendesk-webhook-signature",
        sign_zendesk(payload.as_bytes(), ts, "zd-secret").parse().unwrap(),
    );
    let (status, _) = send(build_router(state(config, Some(&server))), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_zendesk_malformed_body() {
    let server = MockServer::start().await;
    let (status, body) = send(
        build_router(state(config(), Some(&server))),
        post("/zendesk-webhook", "{not json"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

// ============================================================================
// HubSpot
// ============================================================================

#[tokio::test]
async fn test_hubspot_batch_is_one_write() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appYOBOT/CRM%20Events"))
        .and(body_partial_json(json!({
            "records": [
                { "fields": { "Event Type": "contact.creation", "Object ID": "123" } },
                { "fields": { "Event Type": "deal.creation", "Object ID": "900" } }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [created("recH1"), created("recH2")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config();
    config.hubspot_secret = Some("hs-secret".to_string());

    let payload = json!([
        { "eventId": 1, "subscriptionType": "contact.creation", "objectId": 123 },
        { "eventId": 2, "subscriptionType": "deal.creation", "objectId": 900 }
    ])
    .to_string();

    let mut request = post("/hubspot-webhook", payload.clone());
    request.headers_mut().insert(
        "x-hubspot-signature",
        sign_hubspot(payload.as_bytes(), "hs-secret").parse().unwrap(),
    );

    let (status, body) = send(build_router(state(config, Some(&server))), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_ids"], json!(["recH1", "recH2"]));
}

#[tokio::test]
async fn test_hubspot_bad_signature() {
    let mut config = config();
    config.hubspot_secret = Some("hs-secret".to_string());

    let mut request = post("/hubspot-webhook", "[]");
    request
        .headers_mut()
        .insert("x-hubspot-signature", "deadbeef".parse().unwrap());

    let (status, _) = send(build_router(state(config, None)), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_hubspot_object_body_rejected() {
    let server = MockServer::start().await;
    let (status, _) = send(
        build_router(state(config(), Some(&server))),
        post("/hubspot-webhook", json!({ "objectId": 1 }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Lead demo
// ============================================================================

#[tokio::test]
async fn test_lead_demo_logs_notifies_and_texts() {
    let airtable_server = MockServer::start().await;
    let slack_server = MockServer::start().await;
    let twilio_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appYOBOT/Leads"))
        .and(body_partial_json(json!({
            "fields": { "Name": "Dana Smith", "Phone": "+15551234567", "Company": "Acme Co" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(created("recLead")))
        .expect(1)
        .mount(&airtable_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({ "text": "New Lead: Dana Smith" })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM1" })))
        .expect(1)
        .mount(&twilio_server)
        .await;

    let slack: Arc<dyn NotifyChannel> =
        Arc::new(SlackChannel::new(format!("{}/hook", slack_server.uri())));
    let app_state = AppState {
        config: config(),
        airtable: Some(airtable(&airtable_server)),
        notifier: Arc::new(Notifier::with_channels(vec![slack])),
        twilio: Some(
            TwilioClient::new("AC1", "tok", "+15550001111").with_base_url(twilio_server.uri()),
        ),
    };

    let payload = json!({ "name": "Dana Smith", "phone": "+15551234567", "company": "Acme Co" });
    let (status, body) = send(build_router(app_state), post("/lead-demo", payload.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_id"], "recLead");
    assert_eq!(body["sms_sent"], true);
}

#[tokio::test]
async fn test_lead_demo_sms_failure_still_succeeds() {
    let airtable_server = MockServer::start().await;
    let twilio_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(created("recLead")))
        .mount(&airtable_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&twilio_server)
        .await;

    let mut app_state = state(config(), Some(&airtable_server));
    app_state.twilio =
        Some(TwilioClient::new("AC1", "tok", "+15550001111").with_base_url(twilio_server.uri()));

    let payload = json!({ "name": "Dana", "phone": "+15551234567" });
    let (status, body) = send(build_router(app_state), post("/lead-demo", payload.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sms_sent"], false);
}

#[tokio::test]
async fn test_lead_demo_validation() {
    let server = MockServer::start().await;
    let (status, body) = send(
        build_router(state(config(), Some(&server))),
        post("/lead-demo", json!({ "name": "Dana" }).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email or phone is required");
}

#[tokio::test]
async fn test_lead_demo_without_airtable() {
    let (status, _) = send(
        build_router(state(config(), None)),
        post("/lead-demo", json!({ "name": "Dana", "email": "d@acme.co" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_airtable_rejection_is_bad_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": { "type": "INVALID_VALUE_FOR_COLUMN", "message": "bad value" }
        })))
        .mount(&server)
        .await;

    let (status, body) = send(
        build_router(state(config(), Some(&server))),
        post("/lead-demo", json!({ "name": "Dana", "email": "d@acme.co" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
}

// ============================================================================
// Voice bot
// ============================================================================

#[tokio::test]
async fn test_voicebot_log() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appYOBOT/VoiceBot%20Logs"))
        .and(body_partial_json(json!({
            "fields": { "Summary": "Asked about pricing", "Duration (s)": 42 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(created("recVB")))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({ "caller_name": "Sam", "summary": "Asked about pricing", "duration_secs": 42 });
    let (status, body) = send(
        build_router(state(config(), Some(&server))),
        post("/log-voicebot", payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_id"], "recVB");
}

#[tokio::test]
async fn test_body_limit() {
    let server = MockServer::start().await;
    let mut config = config();
    config.max_body_bytes = 64;

    let payload = json!({ "summary": "x".repeat(500) }).to_string();
    let (status, _) = send(
        build_router(state(config, Some(&server))),
        post("/log-voicebot", payload),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
