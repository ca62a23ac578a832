//! YoBot webhook service binary.
//!
//! Standalone HTTP service that logs Zendesk, HubSpot, lead, and voice-bot
//! webhooks to Airtable and posts summaries to Slack.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use airtable::AirtableClient;
use integrations::{server, Config, Secrets, TwilioClient};
use notify::Notifier;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    info!("Starting YoBot webhook service...");

    let config = Config::default();
    let secrets = Secrets::from_env();

    let airtable = match AirtableClient::from_env() {
        Ok(client) => {
            info!(base_id = %client.base_id(), "Airtable client configured");
            Some(client)
        }
        Err(e) => {
            warn!(error = %e, "Airtable not configured - logging endpoints will return 503");
            None
        }
    };

    let twilio = if config.lead_sms {
        match TwilioClient::from_secrets(&secrets) {
            Ok(client) => Some(client),
            Err(e) => {
                info!(error = %e, "Lead confirmation SMS disabled");
                None
            }
        }
    } else {
        None
    };

    let notifier = Arc::new(Notifier::from_env());
    if !notifier.has_channels() {
        info!("No notification channels configured - Slack summaries disabled");
    }

    let state = server::AppState {
        config: config.clone(),
        airtable,
        notifier,
        twilio,
    };

    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "YoBot webhook service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// `YOBOT_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("yobot_webhooks=info,integrations=info,airtable=info,tower_http=info"))
        .context("Invalid log filter")?;

    let json = std::env::var("YOBOT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}
