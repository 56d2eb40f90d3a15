//! LAS Harmonizer - batch well-log canonicalisation
//!
//! # Usage
//!
//! ```bash
//! # Process every field with las_harmonizer.toml (or built-in defaults)
//! cargo run --release
//!
//! # Override locations and the worker count
//! las-harmonizer --source data/zip_files --destination out --concurrency 64
//!
//! # Inspect one output document
//! las-harmonizer inspect data/las_files/F1/Smith_1.las
//!
//! # Write the effective configuration
//! las-harmonizer print-config > las_harmonizer.toml
//! ```
//!
//! # Environment Variables
//!
//! - `LAS_HARMONIZER_CONFIG`: Path to the TOML configuration file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use las_harmonizer::config::HarmonizerConfig;
use las_harmonizer::formation::FormationTable;
use las_harmonizer::pipeline::{BatchOrchestrator, FieldStatus, RunSummary};
use las_harmonizer::reporting::ErrorReporter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long to wait for workers abandoned after a timeout before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "las-harmonizer")]
#[command(about = "Canonicalise LAS well logs against per-field reference tables")]
#[command(version)]
struct CliArgs {
    /// Configuration file (default: $LAS_HARMONIZER_CONFIG, then ./las_harmonizer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Root holding one directory of archives per field
    #[arg(long)]
    source: Option<PathBuf>,

    /// Root holding one directory of reference tables per field
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Root receiving one directory of output documents per field
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Error ledger file
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Maximum concurrent workers (0 = one per CPU)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Process every field (the default)
    Run,

    /// Show header, curves and per-formation sample counts of one document
    Inspect {
        /// LAS file to inspect
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    PrintConfig,
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<HarmonizerConfig> {
    let mut config = match &args.config {
        Some(path) => HarmonizerConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HarmonizerConfig::load(),
    };

    if let Some(source) = &args.source {
        config.paths.source_dir = source.clone();
    }
    if let Some(tables) = &args.tables {
        config.paths.tables_dir = tables.clone();
    }
    if let Some(destination) = &args.destination {
        config.paths.destination_dir = destination.clone();
    }
    if let Some(ledger) = &args.ledger {
        config.paths.ledger_path = ledger.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.processing.concurrency = concurrency;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_batch(config: HarmonizerConfig, summary_json: bool) -> Result<RunSummary> {
    let ledger_path = config.paths.ledger_path.clone();
    let (reporter, reporter_task) = ErrorReporter::spawn(ledger_path.clone());

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, finishing in-flight work and stopping");
        shutdown_token.cancel();
    });

    info!(
        concurrency = config.effective_concurrency(),
        destination = %config.paths.destination_dir.display(),
        "Starting batch"
    );
    let summary = BatchOrchestrator::new(config, reporter.clone())
        .with_cancellation(cancel_token)
        .run()
        .await
        .context("batch failed")?;

    let stats = reporter.flush().await.context("flushing error ledger")?;
    drop(reporter);
    // Abandoned workers keep a reporter handle alive; everything they reported
    // before the flush is already on disk
    match tokio::time::timeout(SHUTDOWN_GRACE, reporter_task).await {
        Ok(joined) => {
            joined.context("error reporter task")?;
        }
        Err(_) => warn!("Timed-out workers still running, not waiting for the error reporter"),
    }

    if summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!(
            "Ledger {}: {} new, {} duplicate",
            ledger_path.display(),
            stats.appended,
            stats.duplicates
        );
    }
    if stats.write_failures > 0 {
        warn!(failures = stats.write_failures, "Some ledger writes failed");
    }
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{:<24} {:>10} {:>8} {:>8} {:>10} {:>8}",
        "FIELD", "DISCOVERED", "OUTPUTS", "WRITTEN", "UNCHANGED", "ERRORS"
    );
    for field in &summary.fields {
        match &field.status {
            FieldStatus::Skipped { reason } => {
                println!("{:<24} skipped: {}", field.field, reason);
            }
            status => {
                println!(
                    "{:<24} {:>10} {:>8} {:>8} {:>10} {:>8}{}",
                    field.field,
                    field.discovered,
                    field.outputs,
                    field.written,
                    field.unchanged,
                    field.errors(),
                    if *status == FieldStatus::Cancelled { " (cancelled)" } else { "" }
                );
            }
        }
    }
    if summary.cancelled {
        println!("Run cancelled before all fields were processed");
    }
}

fn inspect(path: &Path) -> Result<()> {
    let doc = las_harmonizer::las::read_path(path)
        .with_context(|| format!("reading {}", path.display()))?;

    println!("{}", path.display());
    println!("~Well");
    for item in doc.well.iter() {
        println!("  {:<8} {:<6} {}", item.mnemonic, item.unit, item.value);
    }

    println!("~Curves ({} rows)", doc.row_count());
    for curve in std::iter::once(&doc.index).chain(doc.curves.iter()) {
        let present = curve.values.iter().filter(|v| !v.is_nan()).count();
        println!("  {:<10} {:<8} {} samples", curve.mnemonic, curve.unit, present);
    }

    let table = FormationTable::parse(&doc.other).context("parsing formation table")?;
    if table.is_empty() {
        println!("~Formations: none");
    } else {
        println!("~Formations");
        for (name, count) in table.sample_counts(doc.depths()) {
            println!("  {:<24} {}", name, count);
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json_logs);

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let result = runtime.block_on(dispatch(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn dispatch(args: CliArgs) -> Result<()> {
    match &args.command {
        Some(SubCommand::Inspect { file }) => inspect(file),
        Some(SubCommand::PrintConfig) => {
            let config = load_config(&args)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Some(SubCommand::Run) | None => {
            let config = load_config(&args)?;
            run_batch(config, args.summary_json).await?;
            Ok(())
        }
    }
}
