//! Result sink that writes one Airtable row per check.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use airtable::{AirtableClient, Fields};

use crate::report::{BatchContext, CheckRecord, CheckStatus};
use crate::sink::{ResultSink, SinkError};

/// Column labels of the results table.
///
/// Optional columns are only written when set, so tables that lack them
/// do not reject the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldMap {
    pub name: String,
    pub status: String,
    pub notes: String,
    pub date: String,
    pub retry_attempted: String,
    pub qa_owner: Option<String>,
    pub attempts: Option<String>,
    pub batch_id: Option<String>,
    pub duration_ms: Option<String>,
    /// Value written to `status` for a pass
    pub pass_value: String,
    /// Value written to `status` for a failure
    pub fail_value: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            name: "🔧 Integration Name".to_string(),
            status: "✅ Pass/Fail".to_string(),
            notes: "🧠 Notes / Debug".to_string(),
            date: "📅 Test Date".to_string(),
            retry_attempted: "🔁 Retry Attempted?".to_string(),
            qa_owner: Some("🧪 QA Owner".to_string()),
            attempts: None,
            batch_id: None,
            duration_ms: None,
            pass_value: "✅ Pass".to_string(),
            fail_value: "❌ Fail".to_string(),
        }
    }
}

impl FieldMap {
    /// Default labels plus attempts, batch ID, and duration columns.
    #[must_use]
    pub fn extended() -> Self {
        Self {
            attempts: Some("🔢 Attempts".to_string()),
            batch_id: Some("🆔 Batch ID".to_string()),
            duration_ms: Some("⏱️ Duration (ms)".to_string()),
            ..Self::default()
        }
    }
}

/// How result rows are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// POST a new row per result
    #[default]
    Append,
    /// PATCH the row whose name column matches, creating it if absent
    Upsert,
}

/// Writes check results to an Airtable table.
pub struct AirtableSink {
    client: AirtableClient,
    table: String,
    fields: FieldMap,
    mode: LogMode,
    qa_owner: Option<String>,
}

impl AirtableSink {
    /// Append results to `table` using the default column labels.
    #[must_use]
    pub fn new(client: AirtableClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            fields: FieldMap::default(),
            mode: LogMode::Append,
            qa_owner: None,
        }
    }

    /// Use custom column labels.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }

    /// Choose append or upsert.
    #[must_use]
    pub const fn with_mode(mut self, mode: LogMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fill the QA owner column.
    #[must_use]
    pub fn with_qa_owner(mut self, owner: impl Into<String>) -> Self {
        self.qa_owner = Some(owner.into());
        self
    }

    /// Build the row for a record.
    #[must_use]
    pub fn row(&self, ctx: &BatchContext, record: &CheckRecord) -> Fields {
        let map = &self.fields;
        let status = match record.status {
            CheckStatus::Pass => map.pass_value.clone(),
            CheckStatus::Fail | CheckStatus::Skipped => map.fail_value.clone(),
        };

        let mut row = Fields::new();
        row.insert(map.name.clone(), Value::String(record.name.clone()));
        row.insert(map.status.clone(), Value::String(status));
        row.insert(map.notes.clone(), Value::String(record.note.clone()));
        row.insert(map.date.clone(), Value::String(record.finished_at.to_rfc3339()));
        row.insert(map.retry_attempted.clone(), Value::Bool(record.retry_attempted));

        if let (Some(column), Some(owner)) = (&map.qa_owner, &self.qa_owner) {
            row.insert(column.clone(), Value::String(owner.clone()));
        }
        if let Some(column) = &map.attempts {
            row.insert(column.clone(), json!(record.attempts));
        }
        if let Some(column) = &map.batch_id {
            row.insert(column.clone(), Value::String(ctx.batch_id.to_string()));
        }
        if let Some(column) = &map.duration_ms {
            row.insert(column.clone(), json!(record.duration_ms));
        }

        row
    }
}

#[async_trait]
impl ResultSink for AirtableSink {
    fn name(&self) -> &'static str {
        "airtable"
    }

    async fn record(&self, ctx: &BatchContext, record: &CheckRecord) -> Result<(), SinkError> {
        let row = self.row(ctx, record);

        let written = match self.mode {
            LogMode::Append => self.client.log_event(&self.table, row).await?,
            LogMode::Upsert => {
                self.client
                    .upsert_by_field(&self.table, &self.fields.name, &record.name, row)
                    .await?
            }
        };

        debug!(check = %record.name, record_id = %written.id, "Result written to Airtable");
        Ok(())
    }
}
