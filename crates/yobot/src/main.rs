//! YoBot operator CLI.
//!
//! Run `yobot --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

mod plan;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use airtable::{AirtableClient, Fields};
use harness::{
    AirtableSink, BatchReport, BatchRunner, CheckStatus, NotifySink, ResultSink, TracingSink,
};
use integrations::{builtin_probes, select_checks, probes::SLACK_PROBE, Secrets};
use notify::{Notifier, SlackChannel};

use crate::plan::{Overrides, Plan};

#[derive(Parser)]
#[command(name = "yobot")]
#[command(about = "YoBot smoke tests, Airtable lookups, and Slack messages")]
#[command(version)]
struct Cli {
    /// Output format: json, text
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List or run vendor smoke checks
    Checks {
        #[command(subcommand)]
        action: ChecksCommand,
    },

    /// Find the first record where a field equals a value
    Lookup {
        /// Table name
        #[arg(short, long)]
        table: String,

        /// Field to match
        #[arg(long)]
        field: String,

        /// Value to match
        #[arg(long)]
        value: String,
    },

    /// Append a row to a table
    Log {
        /// Table name
        #[arg(short, long)]
        table: String,

        /// Field assignment, KEY=VALUE (repeatable); JSON values are kept typed
        #[arg(short, long = "set", value_name = "KEY=VALUE", required = true, value_parser = parse_assignment)]
        set: Vec<(String, Value)>,
    },

    /// Post a plain message to the Slack webhook
    Notify {
        /// Message text
        #[arg(long)]
        text: String,
    },
}

#[derive(Subcommand)]
enum ChecksCommand {
    /// Show built-in checks and the variables they need
    List,

    /// Run checks through the batch harness
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Only run these checks (repeatable)
    #[arg(long, value_name = "NAME")]
    only: Vec<String>,

    /// TOML plan file
    #[arg(long, env = "YOBOT_PLAN")]
    plan: Option<PathBuf>,

    /// Batch label
    #[arg(long)]
    label: Option<String>,

    /// Checks in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Pause between launches, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Attempts per check
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-attempt timeout, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Stop launching checks after the first failure
    #[arg(long)]
    halt_on_failure: bool,

    /// Airtable results table
    #[arg(long)]
    table: Option<String>,

    /// Update each check's existing row instead of appending
    #[arg(long)]
    upsert: bool,

    /// Do not write results to Airtable
    #[arg(long)]
    no_log: bool,

    /// Post failures and the summary to Slack
    #[arg(long)]
    notify: bool,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            label: self.label.clone(),
            only: self.only.clone(),
            concurrency: self.concurrency,
            delay_ms: self.delay_ms,
            max_attempts: self.max_attempts,
            timeout_secs: self.timeout_secs,
            halt_on_failure: self.halt_on_failure,
            table: self.table.clone(),
            upsert: self.upsert,
        }
    }
}

/// `RUST_LOG` when set and valid, otherwise `debug` with `--verbose` and `warn` without.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(log_filter(cli.verbose, rust_log.as_deref()))
        .init();

    match cli.command {
        Commands::Checks { action } => match action {
            ChecksCommand::List => {
                list_checks(cli.format)?;
                Ok(ExitCode::SUCCESS)
            }
            ChecksCommand::Run(args) => run_checks(&args, cli.format).await,
        },
        Commands::Lookup {
            table,
            field,
            value,
        } => {
            run_lookup(&table, &field, &value, cli.format).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Log { table, set } => {
            run_log(&table, set, cli.format).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Notify { text } => {
            SlackChannel::from_env()
                .post_text(&text)
                .await
                .context("Failed to post Slack message")?;
            println!("✅ Sent Slack message");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn list_checks(format: OutputFormat) -> Result<()> {
    let secrets = Secrets::from_env();

    let mut rows: Vec<(String, Vec<String>)> = builtin_probes()
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                p.required_vars().into_iter().map(String::from).collect(),
            )
        })
        .collect();
    rows.push((
        SLACK_PROBE.to_string(),
        vec![notify::channels::slack::ENV_SLACK_WEBHOOK_URL.to_string()],
    ));

    match format {
        OutputFormat::Json => {
            let items: Vec<Value> = rows
                .iter()
                .map(|(name, vars)| {
                    json!({
                        "name": name,
                        "vars": vars,
                        "configured": vars.iter().all(|v| secrets.get(v).is_some()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            for (name, vars) in &rows {
                let configured = vars.iter().all(|v| secrets.get(v).is_some());
                let marker = if configured { "✅" } else { "⚪" };
                println!("{marker} {:<14} {}", name.bold(), vars.join(", ").dimmed());
            }
        }
    }
    Ok(())
}

async fn run_checks(args: &RunArgs, format: OutputFormat) -> Result<ExitCode> {
    let plan = match &args.plan {
        Some(path) => Plan::load(path)?,
        None => Plan::default(),
    }
    .with_overrides(args.overrides());

    let secrets = Arc::new(Secrets::from_env());
    let checks = select_checks(&plan.checks, &secrets)?;

    let mut runner = BatchRunner::new(plan.runner.clone())
        .context("Invalid runner settings")?
        .with_sink(Arc::new(TracingSink));

    if !args.no_log {
        match AirtableClient::from_env() {
            Ok(client) => runner = runner.with_sink(airtable_sink(client, &plan)),
            Err(e) => warn!(error = %e, "Results will not be logged to Airtable"),
        }
    }

    if args.notify {
        let notifier = Notifier::from_env();
        if notifier.has_channels() {
            runner = runner.with_sink(Arc::new(NotifySink::new(Arc::new(notifier))));
        } else {
            warn!("--notify given but no notification channel is configured");
        }
    }

    if matches!(format, OutputFormat::Text) {
        println!(
            "{}",
            format!("🚀 Running {} check(s): {}", checks.len(), plan.label)
                .cyan()
                .bold()
        );
    }

    let report = runner.run(plan.label.clone(), checks).await;
    print_report(&report, format)?;

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn airtable_sink(client: AirtableClient, plan: &Plan) -> Arc<dyn ResultSink> {
    let mut sink = AirtableSink::new(client, plan.log.table.clone()).with_mode(plan.log.mode);
    if let Some(fields) = &plan.log.fields {
        sink = sink.with_fields(fields.clone());
    }
    if let Some(owner) = &plan.log.qa_owner {
        sink = sink.with_qa_owner(owner.clone());
    }
    Arc::new(sink)
}

fn print_report(report: &BatchReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for record in &report.records {
                let line = record.status_line();
                let line = match record.status {
                    CheckStatus::Pass => line.green(),
                    CheckStatus::Fail => line.red(),
                    CheckStatus::Skipped => line.yellow(),
                };
                println!("{line}");
            }
            let summary = report.summary_line();
            if report.all_passed() {
                println!("{}", summary.green().bold());
            } else {
                println!("{}", summary.red().bold());
            }
        }
    }
    Ok(())
}

async fn run_lookup(table: &str, field: &str, value: &str, format: OutputFormat) -> Result<()> {
    let client = AirtableClient::from_env()?;
    let record = client.find_first(table, field, value).await?;

    match (record, format) {
        (Some(record), OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(&record)?),
        (None, OutputFormat::Json) => println!("null"),
        (Some(record), OutputFormat::Text) => {
            println!("✅ {} {}", "Found".green(), record.id.bold());
            for (key, value) in &record.fields {
                println!("  {key}: {value}");
            }
        }
        (None, OutputFormat::Text) => {
            println!("❌ no record in {table} where {field} = {value}");
        }
    }
    Ok(())
}

async fn run_log(table: &str, assignments: Vec<(String, Value)>, format: OutputFormat) -> Result<()> {
    let fields: Fields = assignments.into_iter().collect();
    let client = AirtableClient::from_env()?;
    let record = client.log_event(table, fields).await?;

    match format {
        OutputFormat::Json => println!("{}", json!({ "record_id": record.id })),
        OutputFormat::Text => println!("✅ Logged record {} to {table}", record.id.bold()),
    }
    Ok(())
}

/// Parse `KEY=VALUE`; the value is JSON when it parses, a string otherwise.
fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty field name in '{raw}'");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
