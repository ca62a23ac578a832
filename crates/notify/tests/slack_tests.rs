//! Slack webhook delivery tests against a mock server.

use std::sync::Arc;

use notify::{ChannelError, Notifier, NotifyChannel, NotifyEvent, Severity, SlackChannel};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn webhook(server: &MockServer) -> String {
    format!("{}/services/T000/B000/XXXX", server.uri())
}

#[tokio::test]
async fn test_post_text_sends_bare_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/T000/B000/XXXX"))
        .and(body_json(json!({ "text": "✅ QA Test #12 passed" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = SlackChannel::new(webhook(&server));
    channel.post_text("✅ QA Test #12 passed").await.unwrap();
}

#[tokio::test]
async fn test_send_event_uses_fallback_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/T000/B000/XXXX"))
        .and(body_partial_json(json!({ "text": "New Lead: Dana Smith" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let channel = SlackChannel::new(webhook(&server));
    channel
        .send(&NotifyEvent::LeadCaptured {
            name: "Dana Smith".to_string(),
            email: Some("dana@example.com".to_string()),
            company: Some("Acme Co".to_string()),
            source: Some("website".to_string()),
            timestamp: chrono::Utc::now(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let channel = SlackChannel::new(webhook(&server));
    let err = channel.post_text("hello").await.unwrap_err();

    assert!(matches!(err, ChannelError::RateLimited { retry_after_secs: 7 }));
}

#[tokio::test]
async fn test_rejected_webhook() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
        .mount(&server)
        .await;

    let channel = SlackChannel::new(webhook(&server));
    let err = channel.post_text("hello").await.unwrap_err();

    match err {
        ChannelError::Rejected { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no_service");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_notifier_collects_channel_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Notifier::with_channels(vec![Arc::new(SlackChannel::new(webhook(&server)))]);
    let results = notifier
        .notify_and_wait(NotifyEvent::message("batch done", Severity::Info))
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "slack");
    assert!(results[0].1.is_ok());
}
