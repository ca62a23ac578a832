//! Batch runner behavior: concurrency bound, retry, halting, ordering.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use harness::{
    BatchContext, BatchReport, BatchRunner, Check, CheckError, CheckRecord, CheckStatus, FnCheck,
    MemorySink, Outcome, ResultSink, RunnerConfig, SinkError,
};

fn runner(config: RunnerConfig) -> BatchRunner {
    BatchRunner::new(config).unwrap()
}

/// Tracks how many checks run at the same time.
struct Gauge {
    name: String,
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Check for Gauge {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<Outcome, CheckError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Outcome::pass("ok"))
    }
}

fn failing(name: &str) -> Arc<dyn Check> {
    Arc::new(FnCheck::new(name, || async { Ok(Outcome::fail("HTTP 500")) }))
}

fn passing(name: &str) -> Arc<dyn Check> {
    Arc::new(FnCheck::always_pass(name))
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let checks: Vec<Arc<dyn Check>> = (0..8)
        .map(|i| {
            Arc::new(Gauge {
                name: format!("gauge-{i}"),
                current: Arc::clone(&current),
                peak: Arc::clone(&peak),
            }) as Arc<dyn Check>
        })
        .collect();

    let report = runner(RunnerConfig {
        concurrency: 3,
        ..RunnerConfig::default()
    })
    .run("bounded", checks)
    .await;

    assert_eq!(report.passed(), 8);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_pass() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let flaky: Arc<dyn Check> = Arc::new(FnCheck::new("Stripe", move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                Err(CheckError::Http("connection reset".to_string()))
            } else {
                Ok(Outcome::pass("HTTP 200 from Stripe"))
            }
        }
    }));

    let report = runner(RunnerConfig {
        max_attempts: 3,
        ..RunnerConfig::default()
    })
    .run("retry", vec![flaky])
    .await;

    let record = &report.records[0];
    assert_eq!(record.status, CheckStatus::Pass);
    assert_eq!(record.attempts, 3);
    assert!(record.retry_attempted);
    assert_eq!(record.note, "HTTP 200 from Stripe");
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhausted_keeps_last_note() {
    let report = runner(RunnerConfig {
        max_attempts: 2,
        ..RunnerConfig::default()
    })
    .run("retry", vec![failing("HubSpot")])
    .await;

    let record = &report.records[0];
    assert_eq!(record.status, CheckStatus::Fail);
    assert_eq!(record.attempts, 2);
    assert_eq!(record.note, "HTTP 500");
    assert!(!report.all_passed());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_a_failed_attempt() {
    let slow: Arc<dyn Check> = Arc::new(FnCheck::new("slow", || async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Outcome::pass("too late"))
    }));

    let report = runner(RunnerConfig {
        attempt_timeout: Duration::from_millis(250),
        ..RunnerConfig::default()
    })
    .run("timeouts", vec![slow])
    .await;

    assert_eq!(report.records[0].status, CheckStatus::Fail);
    assert_eq!(report.records[0].note, "timed out after 250ms");
}

#[tokio::test]
async fn test_halt_on_failure_skips_rest() {
    let sink = MemorySink::new();
    let report = runner(RunnerConfig {
        halt_on_failure: true,
        ..RunnerConfig::default()
    })
    .with_sink(Arc::new(sink.clone()))
    .run(
        "halting",
        vec![passing("Airtable"), failing("Stripe"), passing("Twilio"), passing("Render")],
    )
    .await;

    assert!(report.halted);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.records[2].note, "skipped: batch halted");
    assert_eq!(report.records[3].attempts, 0);

    // Sinks see only checks that actually ran
    assert_eq!(sink.records().len(), 2);
    assert_eq!(sink.reports().len(), 1);
    assert!(sink.reports()[0].halted);
}

#[tokio::test(start_paused = true)]
async fn test_halt_stops_launch_after_failure_during_delay() {
    let sink = MemorySink::new();
    let started = tokio::time::Instant::now();
    let report = runner(RunnerConfig {
        concurrency: 2,
        delay: Duration::from_millis(100),
        halt_on_failure: true,
        ..RunnerConfig::default()
    })
    .with_sink(Arc::new(sink.clone()))
    .run(
        "paced",
        vec![failing("Stripe"), passing("Twilio"), passing("Render")],
    )
    .await;

    // Stripe fails while the runner waits out the delay before Twilio
    let statuses: Vec<_> = report.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [CheckStatus::Fail, CheckStatus::Skipped, CheckStatus::Skipped]
    );
    assert!(report.halted);
    assert_eq!(report.records[1].attempts, 0);
    assert_eq!(report.records[1].note, "skipped: batch halted");

    let ran: Vec<_> = sink.records().into_iter().map(|r| r.name).collect();
    assert_eq!(ran, ["Stripe"]);
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_halt_with_parallel_checks_lets_in_flight_finish() {
    let slow_pass: Arc<dyn Check> = Arc::new(FnCheck::new("HubSpot", || async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(Outcome::pass("HTTP 200 from HubSpot"))
    }));
    let slow_fail: Arc<dyn Check> = Arc::new(FnCheck::new("Zendesk", || async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(Outcome::fail("HTTP 401: bad token"))
    }));

    let report = runner(RunnerConfig {
        concurrency: 2,
        delay: Duration::from_millis(100),
        halt_on_failure: true,
        ..RunnerConfig::default()
    })
    .run(
        "parallel",
        vec![slow_pass, slow_fail, passing("Render"), passing("OpenAI")],
    )
    .await;

    // HubSpot and Zendesk both launched before the failure; the permit
    // Render waits on frees only when Zendesk fails
    let statuses: Vec<_> = report.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            CheckStatus::Pass,
            CheckStatus::Fail,
            CheckStatus::Skipped,
            CheckStatus::Skipped
        ]
    );
    assert!(report.halted);
}

#[tokio::test]
async fn test_without_halt_every_check_runs() {
    let report = runner(RunnerConfig::default())
        .run("all", vec![failing("a"), passing("b"), failing("c")])
        .await;

    assert!(!report.halted);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.skipped(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_records_keep_submission_order() {
    let checks: Vec<Arc<dyn Check>> = (0..5u64)
        .map(|i| {
            Arc::new(FnCheck::new(format!("check-{i}"), move || async move {
                // Later checks finish first
                tokio::time::sleep(Duration::from_millis(100 - i * 20)).await;
                Ok(Outcome::pass("ok"))
            })) as Arc<dyn Check>
        })
        .collect();

    let sink = MemorySink::new();
    let report = runner(RunnerConfig {
        concurrency: 5,
        ..RunnerConfig::default()
    })
    .with_sink(Arc::new(sink.clone()))
    .run("ordering", checks)
    .await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["check-0", "check-1", "check-2", "check-3", "check-4"]);
    assert!(report.records.iter().enumerate().all(|(i, r)| r.index == i));

    // Sinks receive results in completion order
    assert_eq!(sink.records()[0].name, "check-4");
}

#[tokio::test(start_paused = true)]
async fn test_delay_between_launches() {
    let start = tokio::time::Instant::now();
    runner(RunnerConfig {
        delay: Duration::from_millis(500),
        ..RunnerConfig::default()
    })
    .run("paced", vec![passing("a"), passing("b"), passing("c")])
    .await;

    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test]
async fn test_empty_batch_passes() {
    let sink = MemorySink::new();
    let report = runner(RunnerConfig::default())
        .with_sink(Arc::new(sink.clone()))
        .run("empty", Vec::new())
        .await;

    assert!(report.records.is_empty());
    assert!(report.all_passed());
    assert!(!report.halted);
    assert_eq!(sink.reports().len(), 1);
}

struct BrokenSink;

#[async_trait]
impl ResultSink for BrokenSink {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn record(&self, _ctx: &BatchContext, _record: &CheckRecord) -> Result<(), SinkError> {
        Err(SinkError::Notify(notify::ChannelError::NotConfigured(
            "nowhere".to_string(),
        )))
    }

    async fn finish(&self, _report: &BatchReport) -> Result<(), SinkError> {
        Err(SinkError::Notify(notify::ChannelError::NotConfigured(
            "nowhere".to_string(),
        )))
    }
}

#[tokio::test]
async fn test_sink_errors_do_not_fail_batch() {
    let memory = MemorySink::new();
    let report = runner(RunnerConfig::default())
        .with_sink(Arc::new(BrokenSink))
        .with_sink(Arc::new(memory.clone()))
        .run("sinks", vec![passing("a")])
        .await;

    assert!(report.all_passed());
    assert_eq!(memory.records().len(), 1);
}
