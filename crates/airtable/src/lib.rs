//! Airtable REST client for YoBot.
//!
//! Airtable is used as an ad-hoc document store: client records, config rows,
//! and audit logs all live in tables addressed by a base ID and a table name.
//! Field names are free-form human labels, so this crate never assumes a
//! schema. Records carry a `serde_json::Map` of fields.
//!
//! # Usage
//!
//! ```no_run
//! use airtable::{AirtableClient, AirtableConfig};
//! use serde_json::json;
//!
//! # async fn example() -> airtable::Result<()> {
//! let client = AirtableClient::new(AirtableConfig::from_env()?)?;
//!
//! // Look a client up by name
//! if let Some(record) = client.find_first("Clients", "Client Name", "Acme Co").await? {
//!     println!("found {}", record.id);
//! }
//!
//! // Append an audit row
//! let fields = json!({ "Event": "demo booked", "Client": "Acme Co" });
//! client.log_event("Event Log", airtable::fields(fields)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `AIRTABLE_API_KEY`: personal access token (required)
//! - `AIRTABLE_BASE_ID`: base to operate on (required)
//! - `AIRTABLE_API_URL`: API root, defaults to `https://api.airtable.com/v0`
//! - `AIRTABLE_TIMEOUT_SECS`: per-request timeout, default 30
//! - `AIRTABLE_MIN_INTERVAL_MS`: minimum spacing between requests, default 200

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod formula;
pub mod models;

pub use client::AirtableClient;
pub use config::AirtableConfig;
pub use error::{AirtableError, Result};
pub use formula::{escape_formula_string, filter_formula_eq};
pub use models::{fields, Fields, ListQuery, Record, SortDirection};
