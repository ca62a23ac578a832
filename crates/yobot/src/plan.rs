//! Batch plan files.
//!
//! ```toml
//! label = "nightly"
//! checks = ["Stripe", "HubSpot"]   # empty runs every built-in check
//!
//! [runner]
//! concurrency = 4
//! delay_ms = 250
//! max_attempts = 2
//!
//! [log]
//! table = "Integration Test Log"
//! mode = "upsert"
//! qa_owner = "ops"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use harness::{FieldMap, LogMode, RunnerConfig};

/// Default results table.
pub const DEFAULT_LOG_TABLE: &str = "Integration Test Log";

/// Where and how results are written to Airtable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub table: String,
    pub mode: LogMode,
    pub qa_owner: Option<String>,
    /// Column labels; the stock labels when omitted
    pub fields: Option<FieldMap>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            table: DEFAULT_LOG_TABLE.to_string(),
            mode: LogMode::Append,
            qa_owner: None,
            fields: None,
        }
    }
}

/// A named batch of checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Plan {
    pub label: String,
    pub checks: Vec<String>,
    pub runner: RunnerConfig,
    pub log: LogSettings,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            label: "smoke-tests".to_string(),
            checks: Vec::new(),
            runner: RunnerConfig::default(),
            log: LogSettings::default(),
        }
    }
}

/// Command-line values that take precedence over the plan file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub label: Option<String>,
    pub only: Vec<String>,
    pub concurrency: Option<usize>,
    pub delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub halt_on_failure: bool,
    pub table: Option<String>,
    pub upsert: bool,
}

impl Plan {
    /// Parse a plan from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid plan file")
    }

    /// Read and parse a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Failed to load plan {}", path.display()))
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(label) = overrides.label {
            self.label = label;
        }
        if !overrides.only.is_empty() {
            self.checks = overrides.only;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.runner.concurrency = concurrency;
        }
        if let Some(delay_ms) = overrides.delay_ms {
            self.runner.delay = Duration::from_millis(delay_ms);
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.runner.max_attempts = max_attempts;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.runner.attempt_timeout = Duration::from_secs(timeout_secs);
        }
        if overrides.halt_on_failure {
            self.runner.halt_on_failure = true;
        }
        if let Some(table) = overrides.table {
            self.log.table = table;
        }
        if overrides.upsert {
            self.log.mode = LogMode::Upsert;
        }
        self
    }
}
