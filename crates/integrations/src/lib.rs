//! Vendor integrations and the inbound webhook service for YoBot.
//!
//! This crate provides:
//! - A credential snapshot read once from the environment
//! - Declarative vendor probes that plug into the batch harness
//! - A minimal Twilio SMS client
//! - Webhook payload types and signature verification (Zendesk, HubSpot)
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Handlers and API methods can fail

pub mod config;
pub mod models;
pub mod probes;
pub mod secrets;
pub mod server;
pub mod twilio;
pub mod webhooks;

pub use config::Config;
pub use probes::{
    builtin_probes, check_names, select_checks, select_probes, Auth, ProbeCheck, ProbeError,
    SlackWebhookCheck, VendorProbe,
};
pub use secrets::Secrets;
pub use twilio::{TwilioClient, TwilioError};
pub use webhooks::{verify_hubspot_signature, verify_zendesk_signature};
