//! What YoBot tells people about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How loudly an event should be surfaced. Ordered from quietest to loudest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Attachment strip color as `0xRRGGBB`.
    #[must_use]
    pub const fn color(&self) -> u32 {
        match self {
            Self::Info => 0x0034_98db,
            Self::Warning => 0x00f3_9c12,
            Self::Critical => 0x00e7_4c3c,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }

    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Warning => "⚠️",
            Self::Critical => "🚨",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "critical" | "error" => Ok(Self::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Something worth a Slack message.
///
/// Serialized with a `type` tag so events can be logged or replayed as JSON;
/// a missing `timestamp` deserializes as now.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A check failed after its last attempt
    CheckFailed {
        batch: String,
        check: String,
        note: String,
        attempts: u32,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    /// A batch run finished or halted
    BatchCompleted {
        batch: String,
        passed: usize,
        failed: usize,
        skipped: usize,
        halted: bool,
        duration_secs: u64,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    /// An inbound webhook (Zendesk, HubSpot, voice bot) was logged
    WebhookReceived {
        source: String,
        summary: String,
        #[serde(default)]
        fields: BTreeMap<String, String>,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    /// Someone asked for a demo
    LeadCaptured {
        name: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        company: Option<String>,
        #[serde(default)]
        source: Option<String>,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },

    /// Free-form operator text
    Message {
        text: String,
        #[serde(default)]
        severity: Severity,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
}

impl NotifyEvent {
    #[must_use]
    pub fn message(text: impl Into<String>, severity: Severity) -> Self {
        Self::Message {
            text: text.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    /// One-line headline, also used as the plain-text fallback.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::CheckFailed { check, .. } => format!("Check Failed: {check}"),
            Self::BatchCompleted { batch, .. } => {
                let verdict = match self.severity() {
                    Severity::Critical => "Halted",
                    Severity::Warning => "Completed with Failures",
                    Severity::Info => "Passed",
                };
                format!("Batch {verdict}: {batch}")
            }
            Self::WebhookReceived { source, .. } => format!("{source} Webhook"),
            Self::LeadCaptured { name, .. } => format!("New Lead: {name}"),
            Self::Message { .. } => "YoBot".to_string(),
        }
    }

    /// A halted batch is critical; failures warn; everything else informs.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::CheckFailed { .. } => Severity::Warning,
            Self::BatchCompleted { halted: true, .. } => Severity::Critical,
            Self::BatchCompleted { failed: 0, .. } => Severity::Info,
            Self::BatchCompleted { .. } => Severity::Warning,
            Self::WebhookReceived { .. } | Self::LeadCaptured { .. } => Severity::Info,
            Self::Message { severity, .. } => *severity,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::CheckFailed { timestamp, .. }
            | Self::BatchCompleted { timestamp, .. }
            | Self::WebhookReceived { timestamp, .. }
            | Self::LeadCaptured { timestamp, .. }
            | Self::Message { timestamp, .. } => *timestamp,
        }
    }
}
