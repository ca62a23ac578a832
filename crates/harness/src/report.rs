//! Per-check records and the aggregate batch report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final status of a check within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Passed (possibly after retries)
    Pass,
    /// Failed after exhausting attempts
    Fail,
    /// Never launched because the batch halted
    Skipped,
}

impl CheckStatus {
    /// Display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Skipped => "Skipped",
        }
    }

    /// Status emoji used in console and Slack output.
    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Pass => "✅",
            Self::Fail => "❌",
            Self::Skipped => "⏭️",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a batch run, shared with sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchContext {
    /// Unique run ID
    pub batch_id: Uuid,
    /// Human label, e.g. `nightly`
    pub label: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl BatchContext {
    /// New context stamped now.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            label: label.into(),
            started_at: Utc::now(),
        }
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Position in the submitted list
    pub index: usize,
    /// Check name
    pub name: String,
    /// Final status
    pub status: CheckStatus,
    /// Note from the last attempt
    pub note: String,
    /// Attempts made (0 when skipped)
    pub attempts: u32,
    /// Whether more than one attempt ran
    pub retry_attempted: bool,
    /// Wall time across all attempts
    pub duration_ms: u64,
    /// When the check reached its final status
    pub finished_at: DateTime<Utc>,
}

impl CheckRecord {
    /// Record for a check that never launched.
    #[must_use]
    pub fn skipped(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            status: CheckStatus::Skipped,
            note: "skipped: batch halted".to_string(),
            attempts: 0,
            retry_attempted: false,
            duration_ms: 0,
            finished_at: Utc::now(),
        }
    }

    /// One-line console rendering: `✅ Stripe (2 attempts, 153ms): HTTP 200 from Stripe`.
    #[must_use]
    pub fn status_line(&self) -> String {
        let attempts = match self.attempts {
            0 => String::new(),
            1 => format!(" ({}ms)", self.duration_ms),
            n => format!(" ({n} attempts, {}ms)", self.duration_ms),
        };
        format!("{} {}{attempts}: {}", self.status.emoji(), self.name, self.note)
    }
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique run ID
    pub batch_id: Uuid,
    /// Human label
    pub label: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub finished_at: DateTime<Utc>,
    /// Whether the run stopped early on a failure
    pub halted: bool,
    /// One record per submitted check, in submission order
    pub records: Vec<CheckRecord>,
}

impl BatchReport {
    fn count(&self, status: CheckStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Number of passed checks.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    /// Number of failed checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    /// Number of checks that never ran.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(CheckStatus::Skipped)
    }

    /// True when nothing failed and nothing was skipped.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    /// Records that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CheckRecord> {
        self.records
            .iter()
            .filter(|r| r.status == CheckStatus::Fail)
    }

    /// Whole seconds between start and finish.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        u64::try_from((self.finished_at - self.started_at).num_seconds()).unwrap_or(0)
    }

    /// Aggregate line, e.g. `📊 nightly: 8/10 passed, 2 failed`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "📊 {}: {}/{} passed, {} failed",
            self.label,
            self.passed(),
            self.records.len(),
            self.failed()
        );
        if self.skipped() > 0 {
            line.push_str(&format!(", {} skipped", self.skipped()));
        }
        if self.halted {
            line.push_str(" (halted)");
        }
        line
    }
}
