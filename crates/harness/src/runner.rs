//! Bounded-concurrency batch execution with retry and halting.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use chrono::Utc;

use crate::check::{Check, CheckError, Outcome};
use crate::config::{ConfigError, RunnerConfig};
use crate::report::{BatchContext, BatchReport, CheckRecord, CheckStatus};
use crate::sink::ResultSink;

/// Runs a list of checks and reports every result.
pub struct BatchRunner {
    config: RunnerConfig,
    sinks: Vec<Arc<dyn ResultSink>>,
}

impl BatchRunner {
    /// Create a runner without sinks.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RunnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            sinks: Vec::new(),
        })
    }

    /// Add a sink that receives each record and the final report.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute `checks` and return their records in submission order.
    pub async fn run(&self, label: impl Into<String>, checks: Vec<Arc<dyn Check>>) -> BatchReport {
        let ctx = Arc::new(BatchContext::new(label));
        let sinks: Arc<[Arc<dyn ResultSink>]> = self.sinks.clone().into();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let failed = Arc::new(AtomicBool::new(false));
        let halt_on_failure = self.config.halt_on_failure;

        info!(
            batch_id = %ctx.batch_id,
            label = %ctx.label,
            checks = checks.len(),
            concurrency = self.config.concurrency,
            "Starting batch"
        );

        let names: Vec<String> = checks.iter().map(|c| c.name().to_string()).collect();
        let mut slots: Vec<Option<CheckRecord>> = vec![None; checks.len()];
        let mut tasks = JoinSet::new();
        let mut launched = 0;

        for (index, check) in checks.into_iter().enumerate() {
            if halt_on_failure && failed.load(Ordering::SeqCst) {
                break;
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            // A failure may have landed while waiting for the permit
            if halt_on_failure && failed.load(Ordering::SeqCst) {
                break;
            }

            if index > 0 && !self.config.delay.is_zero() {
                sleep(self.config.delay).await;

                // Or during the pause between launches
                if halt_on_failure && failed.load(Ordering::SeqCst) {
                    break;
                }
            }

            let config = self.config.clone();
            let ctx = Arc::clone(&ctx);
            let sinks = Arc::clone(&sinks);
            let failed = Arc::clone(&failed);

            tasks.spawn(async move {
                let record = execute(index, check.as_ref(), &config).await;
                if record.status == CheckStatus::Fail {
                    failed.store(true, Ordering::SeqCst);
                }
                drop(permit);

                dispatch(&sinks, &ctx, &record).await;
                record
            });
            launched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(record) => {
                    let index = record.index;
                    slots[index] = Some(record);
                }
                Err(e) => warn!(error = %e, "Check task did not complete"),
            }
        }

        let halted = launched < names.len();
        let records = slots
            .into_iter()
            .zip(names)
            .enumerate()
            .map(|(index, (slot, name))| {
                slot.unwrap_or_else(|| {
                    if index < launched {
                        aborted(index, name)
                    } else {
                        CheckRecord::skipped(index, name)
                    }
                })
            })
            .collect();

        let report = BatchReport {
            batch_id: ctx.batch_id,
            label: ctx.label.clone(),
            started_at: ctx.started_at,
            finished_at: Utc::now(),
            halted,
            records,
        };

        if halted {
            warn!(
                batch_id = %report.batch_id,
                skipped = report.skipped(),
                "Batch halted after a failure"
            );
        }

        for sink in sinks.iter() {
            if let Err(e) = sink.finish(&report).await {
                warn!(sink = sink.name(), error = %e, "Result sink failed to finish");
            }
        }

        report
    }
}

/// Run one check through its attempts and build its record.
async fn execute(index: usize, check: &dyn Check, config: &RunnerConfig) -> CheckRecord {
    let started = Instant::now();
    let mut attempts = 0;
    let mut passed = false;
    let mut note = String::new();

    while attempts < config.max_attempts {
        attempts += 1;

        let attempt = AssertUnwindSafe(check.run()).catch_unwind();
        let retryable = match timeout(config.attempt_timeout, attempt).await {
            Ok(Ok(Ok(Outcome::Pass { note: n }))) => {
                passed = true;
                note = n;
                break;
            }
            Ok(Ok(Ok(Outcome::Fail { note: n }))) => {
                note = n;
                true
            }
            Ok(Ok(Err(e))) => {
                note = e.to_string();
                e.is_retryable()
            }
            Ok(Err(_)) => {
                note = "check panicked".to_string();
                true
            }
            Err(_) => {
                note = CheckError::Timeout(config.attempt_timeout).to_string();
                true
            }
        };

        if !retryable || attempts >= config.max_attempts {
            break;
        }

        let backoff = retry_delay(config, attempts);
        debug!(
            check = check.name(),
            attempt = attempts,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            note = %note,
            "Attempt failed, retrying"
        );
        sleep(backoff).await;
    }

    CheckRecord {
        index,
        name: check.name().to_string(),
        status: if passed {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        },
        note,
        attempts,
        retry_attempted: attempts > 1,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        finished_at: Utc::now(),
    }
}

/// Linear backoff, capped at `Duration::MAX`.
fn retry_delay(config: &RunnerConfig, attempts: u32) -> Duration {
    config.retry_backoff.saturating_mul(attempts)
}

async fn dispatch(sinks: &[Arc<dyn ResultSink>], ctx: &BatchContext, record: &CheckRecord) {
    for sink in sinks {
        if let Err(e) = sink.record(ctx, record).await {
            warn!(
                sink = sink.name(),
                check = %record.name,
                error = %e,
                "Result sink failed"
            );
        }
    }
}

fn aborted(index: usize, name: String) -> CheckRecord {
    CheckRecord {
        index,
        name,
        status: CheckStatus::Fail,
        note: "check task did not complete".to_string(),
        attempts: 0,
        retry_attempted: false,
        duration_ms: 0,
        finished_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::FnCheck;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_retry_delay_is_linear_and_saturates() {
        let config = RunnerConfig {
            retry_backoff: Duration::from_millis(500),
            ..RunnerConfig::default()
        };
        assert_eq!(retry_delay(&config, 1), Duration::from_millis(500));
        assert_eq!(retry_delay(&config, 3), Duration::from_millis(1500));

        let huge = RunnerConfig {
            retry_backoff: Duration::from_millis(u64::MAX),
            ..RunnerConfig::default()
        };
        assert_eq!(retry_delay(&huge, 4), Duration::MAX);
    }

    #[tokio::test]
    async fn test_execute_passes_first_try() {
        let check = FnCheck::always_pass("noop");
        let record = execute(4, &check, &RunnerConfig::default()).await;

        assert_eq!(record.index, 4);
        assert_eq!(record.status, CheckStatus::Pass);
        assert_eq!(record.attempts, 1);
        assert!(!record.retry_attempted);
        assert_eq!(record.note, "placeholder check");
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_reports_last_note() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let check = FnCheck::new("flaky", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(Outcome::fail(format!("attempt {n}"))) }
        });
        let config = RunnerConfig {
            max_attempts: 3,
            ..RunnerConfig::default()
        };

        let record = execute(0, &check, &config).await;
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.note, "attempt 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_credential_is_not_retried() {
        let check = FnCheck::new("stripe", || async {
            Err(CheckError::MissingCredential("STRIPE_SECRET_KEY".to_string()))
        });
        let config = RunnerConfig {
            max_attempts: 5,
            ..RunnerConfig::default()
        };

        let record = execute(0, &check, &config).await;
        assert_eq!(record.attempts, 1);
        assert_eq!(record.note, "missing credential: STRIPE_SECRET_KEY");
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let check = FnCheck::new("bad", || async {
            let empty: Vec<u32> = Vec::new();
            Ok(Outcome::pass(empty[0].to_string()))
        });
        let record = execute(0, &check, &RunnerConfig::default()).await;
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.note, "check panicked");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_with_attempt() {
        let check = FnCheck::new("down", || async { Ok(Outcome::fail("down")) });
        let config = RunnerConfig {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
            ..RunnerConfig::default()
        };

        let start = Instant::now();
        execute(0, &check, &config).await;
        // 100ms after the first attempt, 200ms after the second
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RunnerConfig {
            concurrency: 0,
            ..RunnerConfig::default()
        };
        assert!(matches!(
            BatchRunner::new(config),
            Err(ConfigError::ZeroConcurrency)
        ));
    }
}
