//! Batch smoke-test harness.
//!
//! A batch is a labelled list of [`Check`]s. The [`BatchRunner`] launches them
//! in order with bounded concurrency and an optional pause between launches,
//! retries failed attempts, and hands every result to the configured
//! [`ResultSink`]s as soon as it is known.
//!
//! ```no_run
//! use std::sync::Arc;
//! use harness::{BatchRunner, Check, FnCheck, RunnerConfig, TracingSink};
//!
//! # async fn example() -> Result<(), harness::ConfigError> {
//! let runner = BatchRunner::new(RunnerConfig {
//!     concurrency: 3,
//!     max_attempts: 2,
//!     ..RunnerConfig::default()
//! })?
//! .with_sink(Arc::new(TracingSink));
//!
//! let checks: Vec<Arc<dyn Check>> = vec![Arc::new(FnCheck::always_pass("Send SMS Alert"))];
//! let report = runner.run("nightly", checks).await;
//! println!("{}", report.summary_line());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod airtable_sink;
pub mod check;
pub mod config;
pub mod report;
pub mod runner;
pub mod sink;

pub use airtable_sink::{AirtableSink, FieldMap, LogMode};
pub use check::{Check, CheckError, FnCheck, Outcome};
pub use config::{ConfigError, RunnerConfig};
pub use report::{BatchContext, BatchReport, CheckRecord, CheckStatus};
pub use runner::BatchRunner;
pub use sink::{MemorySink, NotifySink, ResultSink, SinkError, TracingSink};
