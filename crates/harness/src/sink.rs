//! Destinations for check results.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use notify::{Notifier, NotifyEvent};

use crate::report::{BatchContext, BatchReport, CheckRecord, CheckStatus};

/// Errors raised while writing results somewhere.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Airtable rejected the write
    #[error("Airtable write failed: {0}")]
    Airtable(#[from] airtable::AirtableError),

    /// Notification could not be delivered
    #[error("notification failed: {0}")]
    Notify(#[from] notify::ChannelError),
}

/// Receives each finished check and the final report.
///
/// Sink failures are logged by the runner and never change the batch outcome.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Called once per check as soon as it reaches a final status.
    async fn record(&self, ctx: &BatchContext, record: &CheckRecord) -> Result<(), SinkError>;

    /// Called once after every check has finished or been skipped.
    async fn finish(&self, _report: &BatchReport) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps results in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<CheckRecord>>>,
    reports: Arc<Mutex<Vec<BatchReport>>>,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far, in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<CheckRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Reports received so far.
    #[must_use]
    pub fn reports(&self) -> Vec<BatchReport> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, _ctx: &BatchContext, record: &CheckRecord) -> Result<(), SinkError> {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }

    async fn finish(&self, report: &BatchReport) -> Result<(), SinkError> {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
        Ok(())
    }
}

/// Emits one structured log line per result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl ResultSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn record(&self, ctx: &BatchContext, record: &CheckRecord) -> Result<(), SinkError> {
        match record.status {
            CheckStatus::Pass => info!(
                batch_id = %ctx.batch_id,
                check = %record.name,
                attempts = record.attempts,
                duration_ms = record.duration_ms,
                note = %record.note,
                "Check passed"
            ),
            CheckStatus::Fail | CheckStatus::Skipped => warn!(
                batch_id = %ctx.batch_id,
                check = %record.name,
                status = %record.status,
                attempts = record.attempts,
                retry_attempted = record.retry_attempted,
                note = %record.note,
                "Check did not pass"
            ),
        }
        Ok(())
    }

    async fn finish(&self, report: &BatchReport) -> Result<(), SinkError> {
        info!(
            batch_id = %report.batch_id,
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            halted = report.halted,
            "Batch finished"
        );
        Ok(())
    }
}

/// Posts failures and the batch summary to the configured notifier.
pub struct NotifySink {
    notifier: Arc<Notifier>,
}

impl NotifySink {
    /// Wrap a notifier.
    #[must_use]
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self { notifier }
    }

    async fn deliver(&self, event: NotifyEvent) -> Result<(), SinkError> {
        for (_, result) in self.notifier.notify_and_wait(event).await {
            result?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResultSink for NotifySink {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn record(&self, ctx: &BatchContext, record: &CheckRecord) -> Result<(), SinkError> {
        if record.status != CheckStatus::Fail {
            return Ok(());
        }

        self.deliver(NotifyEvent::CheckFailed {
            batch: ctx.label.clone(),
            check: record.name.clone(),
            note: record.note.clone(),
            attempts: record.attempts,
            timestamp: record.finished_at,
        })
        .await
    }

    async fn finish(&self, report: &BatchReport) -> Result<(), SinkError> {
        self.deliver(NotifyEvent::BatchCompleted {
            batch: report.label.clone(),
            passed: report.passed(),
            failed: report.failed(),
            skipped: report.skipped(),
            halted: report.halted,
            duration_secs: report.duration_secs(),
            timestamp: report.finished_at,
        })
        .await
    }
}
