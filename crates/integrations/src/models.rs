//! Inbound webhook payloads and their Airtable rows.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use airtable::Fields;

/// Identifier that vendors send either as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn insert_opt(fields: &mut Fields, key: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        fields.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

// ============================================================================
// Zendesk
// ============================================================================

/// Ticket fields forwarded by a Zendesk trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZendeskTicket {
    #[serde(alias = "id")]
    pub ticket_id: ExternalId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub requester_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Zendesk triggers may wrap the ticket in a `ticket` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ZendeskWebhook {
    Wrapped { ticket: ZendeskTicket },
    Flat(ZendeskTicket),
}

impl ZendeskWebhook {
    #[must_use]
    pub fn into_ticket(self) -> ZendeskTicket {
        match self {
            Self::Wrapped { ticket } | Self::Flat(ticket) => ticket,
        }
    }
}

impl ZendeskTicket {
    /// Row for the support table.
    #[must_use]
    pub fn to_fields(&self, received_at: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert("Ticket ID".into(), Value::String(self.ticket_id.to_string()));
        fields.insert("Subject".into(), Value::String(self.subject.clone()));
        insert_opt(&mut fields, "Status", self.status.as_deref());
        insert_opt(&mut fields, "Priority", self.priority.as_deref());
        insert_opt(&mut fields, "Requester", self.requester_name.as_deref());
        insert_opt(&mut fields, "Requester Email", self.requester_email.as_deref());
        insert_opt(&mut fields, "Description", self.description.as_deref());
        insert_opt(&mut fields, "Ticket URL", self.url.as_deref());
        fields.insert("📅 Received".into(), Value::String(received_at.to_rfc3339()));
        fields
    }

    /// One-line Slack summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("Ticket #{}: {}", self.ticket_id, self.subject)
    }

    /// Extra Slack fields.
    #[must_use]
    pub fn slack_fields(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(status) = &self.status {
            map.insert("Status".to_string(), status.clone());
        }
        if let Some(priority) = &self.priority {
            map.insert("Priority".to_string(), priority.clone());
        }
        if let Some(requester) = self.requester_email.as_ref().or(self.requester_name.as_ref()) {
            map.insert("Requester".to_string(), requester.clone());
        }
        map
    }
}

// ============================================================================
// HubSpot
// ============================================================================

/// One entry of a HubSpot webhook batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSpotEvent {
    #[serde(default)]
    pub event_id: Option<u64>,
    pub subscription_type: String,
    pub object_id: u64,
    #[serde(default)]
    pub portal_id: Option<u64>,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub property_value: Option<String>,
    #[serde(default)]
    pub change_source: Option<String>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub occurred_at: Option<i64>,
}

impl HubSpotEvent {
    /// Row for the CRM table.
    #[must_use]
    pub fn to_fields(&self, received_at: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            "Event Type".into(),
            Value::String(self.subscription_type.clone()),
        );
        fields.insert("Object ID".into(), Value::String(self.object_id.to_string()));
        if let Some(event_id) = self.event_id {
            fields.insert("Event ID".into(), Value::String(event_id.to_string()));
        }
        insert_opt(&mut fields, "Property", self.property_name.as_deref());
        insert_opt(&mut fields, "Value", self.property_value.as_deref());
        insert_opt(&mut fields, "Change Source", self.change_source.as_deref());

        let occurred = self
            .occurred_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(received_at);
        fields.insert("📅 Occurred".into(), Value::String(occurred.to_rfc3339()));
        fields
    }
}

/// Count events per subscription type for the Slack summary.
#[must_use]
pub fn count_by_type(events: &[HubSpotEvent]) -> BTreeMap<String, String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for event in events {
        *counts.entry(event.subscription_type.clone()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(kind, n)| (kind, n.to_string()))
        .collect()
}

// ============================================================================
// Lead / demo request
// ============================================================================

/// Demo request submitted from the website form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LeadRequest {
    /// Require a name and a way to reach the lead.
    ///
    /// # Errors
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if is_blank(self.email.as_deref()) && is_blank(self.phone.as_deref()) {
            return Err("email or phone is required".to_string());
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !email.contains('@') {
                return Err(format!("invalid email: {email}"));
            }
        }
        Ok(())
    }

    /// Phone number to text, if any.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// Row for the leads table.
    #[must_use]
    pub fn to_fields(&self, received_at: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert("Name".into(), Value::String(self.name.trim().to_string()));
        insert_opt(&mut fields, "Email", self.email.as_deref());
        insert_opt(&mut fields, "Phone", self.phone.as_deref());
        insert_opt(&mut fields, "Company", self.company.as_deref());
        insert_opt(&mut fields, "Source", self.source.as_deref());
        insert_opt(&mut fields, "Message", self.message.as_deref());
        fields.insert("📅 Requested".into(), Value::String(received_at.to_rfc3339()));
        fields
    }
}

// ============================================================================
// Voice bot
// ============================================================================

/// Summary of a call handled by the voice bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceBotCall {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub caller_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl VoiceBotCall {
    /// Require a summary.
    ///
    /// # Errors
    /// Returns a message when the summary is blank.
    pub fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary is required".to_string());
        }
        Ok(())
    }

    /// Row for the voice-bot table.
    #[must_use]
    pub fn to_fields(&self, received_at: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        insert_opt(&mut fields, "Call ID", self.call_id.as_deref());
        insert_opt(&mut fields, "Caller", self.caller_name.as_deref());
        insert_opt(&mut fields, "Phone", self.phone.as_deref());
        fields.insert("Summary".into(), Value::String(self.summary.trim().to_string()));
        insert_opt(&mut fields, "Transcript", self.transcript.as_deref());
        insert_opt(&mut fields, "Outcome", self.outcome.as_deref());
        insert_opt(&mut fields, "Sentiment", self.sentiment.as_deref());
        if let Some(secs) = self.duration_secs {
            fields.insert("Duration (s)".into(), Value::from(secs));
        }
        fields.insert("📅 Logged".into(), Value::String(received_at.to_rfc3339()));
        fields
    }

    /// Who called, for Slack.
    #[must_use]
    pub fn caller(&self) -> &str {
        self.caller_name
            .as_deref()
            .or(self.phone.as_deref())
            .unwrap_or("unknown caller")
    }
}
