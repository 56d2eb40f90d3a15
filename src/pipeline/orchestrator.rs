//! Batch orchestrator
//!
//! Walks the source tree one field at a time (fields in sorted order). Per
//! field: load the reference catalog, extract archives into a scratch
//! directory, plan files by output key, then fan groups out to a bounded
//! pool of blocking workers. A field whose catalog cannot be loaded is
//! reported once and skipped; other fields still run.
//!
//! Cancellation stops new fields and new groups from being submitted.
//! Groups already running finish, and the scratch directory is removed on
//! every path.
//!
//! Each group gets `processing.file_timeout_secs` per file. A group that
//! overruns is reported as timed out for every file it holds and the field
//! moves on; the blocking thread is detached and its outcome discarded.

use crate::catalog::MetadataCatalog;
use crate::config::HarmonizerConfig;
use crate::error::PipelineError;
use crate::header::HeaderSynthesizer;
use crate::las::LasWriter;
use crate::reporting::{ErrorKind, ErrorReporterHandle};
use crate::types::OutputKey;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::archive::{self, ArchiveError};
use super::progress::FieldProgress;
use super::task::{self, FieldContext, FieldPlan, GroupOutcome, PlannedFile};

/// Work done for one output group on a blocking worker thread.
pub type GroupProcessor = Arc<dyn Fn(&FieldContext, &OutputKey, Vec<PlannedFile>) -> GroupOutcome + Send + Sync>;

// ============================================================================
// Run summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Processed,
    Skipped { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub field: String,
    #[serde(flatten)]
    pub status: FieldStatus,
    pub archives: usize,
    pub archive_failures: usize,
    pub discovered: usize,
    pub rejected: usize,
    pub outputs: usize,
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl FieldSummary {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            status: FieldStatus::Processed,
            archives: 0,
            archive_failures: 0,
            discovered: 0,
            rejected: 0,
            outputs: 0,
            written: 0,
            unchanged: 0,
            failed: 0,
        }
    }

    fn skipped(field: &str, reason: impl Into<String>) -> Self {
        Self {
            status: FieldStatus::Skipped {
                reason: reason.into(),
            },
            ..Self::new(field)
        }
    }

    /// Files that ended in any failure state.
    pub fn errors(&self) -> usize {
        self.rejected + self.failed
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub fields: Vec<FieldSummary>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn files_discovered(&self) -> usize {
        self.fields.iter().map(|f| f.discovered).sum()
    }

    pub fn files_written(&self) -> usize {
        self.fields.iter().map(|f| f.written).sum()
    }

    pub fn files_failed(&self) -> usize {
        self.fields.iter().map(FieldSummary::errors).sum()
    }

    pub fn skipped_fields(&self) -> impl Iterator<Item = &FieldSummary> {
        self.fields
            .iter()
            .filter(|f| matches!(f.status, FieldStatus::Skipped { .. }))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.field == name)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct BatchOrchestrator {
    config: HarmonizerConfig,
    reporter: ErrorReporterHandle,
    cancel: CancellationToken,
    processor: GroupProcessor,
}

impl BatchOrchestrator {
    pub fn new(config: HarmonizerConfig, reporter: ErrorReporterHandle) -> Self {
        Self {
            config,
            reporter,
            cancel: CancellationToken::new(),
            processor: Arc::new(task::process_group),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the per-group work (defaults to [`task::process_group`]).
    pub fn with_group_processor(mut self, processor: GroupProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Process every field under the source directory. Only a missing or
    /// unreadable source directory fails the run; everything else lands in
    /// the error ledger.
    pub async fn run(&self) -> io::Result<RunSummary> {
        let fields = list_fields(&self.config.paths.source_dir)?;
        info!(
            fields = fields.len(),
            source = %self.config.paths.source_dir.display(),
            "Batch starting"
        );

        let mut summary = RunSummary::default();
        for field in fields {
            if self.cancel.is_cancelled() {
                warn!(field = %field, "Cancelled before field started");
                summary.cancelled = true;
                break;
            }
            let field_summary = self.run_field(&field).await;
            if field_summary.status == FieldStatus::Cancelled {
                summary.cancelled = true;
            }
            summary.fields.push(field_summary);
        }

        info!(
            fields = summary.fields.len(),
            discovered = summary.files_discovered(),
            written = summary.files_written(),
            failed = summary.files_failed(),
            cancelled = summary.cancelled,
            "Batch complete"
        );
        Ok(summary)
    }

    async fn run_field(&self, field: &str) -> FieldSummary {
        info!(field, "Field starting");
        let paths = &self.config.paths;

        let tables_dir = paths.tables_dir.join(field);
        let prefixes = self.config.tables.clone();
        let loaded = tokio::task::spawn_blocking(move || MetadataCatalog::load(&tables_dir, &prefixes)).await;
        let catalog = match loaded {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(err)) => {
                self.reporter.report(field, field, err.kind(), err.to_string());
                return FieldSummary::skipped(field, err.to_string());
            }
            Err(join_err) => {
                let message = format!("catalog loader failed: {}", join_err);
                self.reporter
                    .report(field, field, ErrorKind::TaskPanicked, message.clone());
                return FieldSummary::skipped(field, message);
            }
        };

        let destination = paths.destination_dir.join(field);
        if let Err(err) = fs::create_dir_all(&destination) {
            let message = format!("cannot create {}: {}", destination.display(), err);
            self.reporter
                .report(field, field, ErrorKind::WriteError, message.clone());
            return FieldSummary::skipped(field, message);
        }

        let scratch = match archive::scratch_dir(field) {
            Ok(dir) => dir,
            Err(err) => {
                self.reporter
                    .report(field, field, ErrorKind::ArchiveError, err.to_string());
                return FieldSummary::skipped(field, err.to_string());
            }
        };

        let mut summary = FieldSummary::new(field);
        let files = self.extract_field(field, scratch.path(), &mut summary).await;
        summary.discovered = files.len();

        let plan = task::plan_field(field, files, &catalog, &self.reporter);
        summary.rejected = plan.rejected;
        summary.outputs = plan.groups.len();

        let progress = Arc::new(FieldProgress::new(field, summary.discovered));
        progress.complete_many(plan.rejected);

        let ctx = Arc::new(FieldContext {
            field: field.to_string(),
            catalog,
            destination,
            synthesizer: HeaderSynthesizer::new(self.config.output.default_null_value),
            writer: LasWriter::new(
                self.config.output.curve_precision,
                self.config.output.depth_precision,
            ),
            reporter: self.reporter.clone(),
            progress: Arc::clone(&progress),
        });

        let cancelled = self.run_groups(ctx, plan, &mut summary).await;
        if cancelled {
            summary.status = FieldStatus::Cancelled;
        }

        // Scratch is removed here, after every worker has finished with it
        drop(scratch);

        info!(
            field,
            discovered = summary.discovered,
            outputs = summary.outputs,
            written = summary.written,
            unchanged = summary.unchanged,
            errors = summary.errors(),
            "Field complete"
        );
        summary
    }

    /// Extract every archive of the field and return the discovered logs.
    /// A bad archive is reported and skipped.
    async fn extract_field(&self, field: &str, scratch: &Path, summary: &mut FieldSummary) -> Vec<PathBuf> {
        let field_source = self.config.paths.source_dir.join(field);
        let archive_ext = self.config.processing.archive_extension.clone();
        let log_ext = self.config.processing.log_extension.clone();
        let scratch = scratch.to_path_buf();

        let extracted = tokio::task::spawn_blocking(move || {
            let archives = archive::list_archives(&field_source, &archive_ext)?;
            let mut failures: Vec<(PathBuf, ArchiveError)> = Vec::new();
            for (ordinal, path) in archives.iter().enumerate() {
                if let Err(err) = archive::extract_archive(path, &scratch, ordinal) {
                    failures.push((path.clone(), err));
                }
            }
            let logs = archive::discover_logs(&scratch, &log_ext);
            Ok::<_, io::Error>((archives.len(), failures, logs))
        })
        .await;

        let (archives, failures, logs) = match extracted {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                self.reporter
                    .report(field, field, ErrorKind::ArchiveError, err.to_string());
                return Vec::new();
            }
            Err(join_err) => {
                self.reporter.report(
                    field,
                    field,
                    ErrorKind::TaskPanicked,
                    format!("archive extraction failed: {}", join_err),
                );
                return Vec::new();
            }
        };

        summary.archives = archives;
        summary.archive_failures = failures.len();
        for (path, err) in failures {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.reporter
                .report(field, &name, ErrorKind::ArchiveError, err.to_string());
        }
        info!(field, archives, logs = logs.len(), "Archives extracted");
        logs
    }

    /// Fan groups out over at most `concurrency` blocking workers. Returns
    /// whether submission stopped early because of cancellation.
    async fn run_groups(&self, ctx: Arc<FieldContext>, plan: FieldPlan, summary: &mut FieldSummary) -> bool {
        let semaphore = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut task_set: JoinSet<(String, GroupOutcome)> = JoinSet::new();
        let mut cancelled = false;
        let per_file = self.config.processing.file_timeout();

        for (key, files) in plan.groups {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                warn!(field = %ctx.field, "Cancelled, not submitting further work");
                cancelled = true;
                break;
            };

            let ctx = Arc::clone(&ctx);
            let processor = Arc::clone(&self.processor);
            task_set.spawn(async move {
                let _permit = permit;
                let label = key.file_name();
                let limit = group_limit(per_file, files.len());
                let names: Vec<String> = files.iter().map(|f| f.task.file_name.clone()).collect();
                let worker_ctx = Arc::clone(&ctx);
                let handle = tokio::task::spawn_blocking(move || processor(worker_ctx.as_ref(), &key, files));
                match tokio::time::timeout(limit, handle).await {
                    Ok(Ok(outcome)) => (label, outcome),
                    Ok(Err(join_err)) => {
                        error!(output = %label, error = %join_err, "Worker failed outside a file");
                        (label, GroupOutcome::default())
                    }
                    Err(_) => {
                        let outcome = abandon_group(&ctx, &label, &names, limit);
                        (label, outcome)
                    }
                }
            });
        }

        while let Some(joined) = task_set.join_next().await {
            match joined {
                Ok((_, outcome)) => {
                    summary.written += outcome.written;
                    summary.unchanged += outcome.unchanged;
                    summary.failed += outcome.failed;
                }
                Err(join_err) => {
                    error!(field = %ctx.field, error = %join_err, "Worker task failed");
                    self.reporter.report(
                        &ctx.field,
                        &ctx.field,
                        ErrorKind::TaskPanicked,
                        join_err.to_string(),
                    );
                }
            }
        }
        cancelled
    }
}

/// Time allowed for a group of `files` files.
fn group_limit(per_file: Duration, files: usize) -> Duration {
    per_file.saturating_mul(u32::try_from(files.max(1)).unwrap_or(u32::MAX))
}

/// Record every file of an overrunning group as timed out.
fn abandon_group(ctx: &FieldContext, label: &str, names: &[String], limit: Duration) -> GroupOutcome {
    error!(
        field = %ctx.field,
        output = %label,
        files = names.len(),
        limit_secs = limit.as_secs(),
        "Group exceeded its time limit, abandoning worker"
    );
    let err = PipelineError::TimedOut { limit };
    for name in names {
        ctx.reporter.report(&ctx.field, name, err.kind(), err.to_string());
    }
    ctx.progress.complete_many(names.len());
    GroupOutcome {
        failed: names.len(),
        ..GroupOutcome::default()
    }
}

/// Field directories directly under `source_dir`, sorted by name.
fn list_fields(source_dir: &Path) -> io::Result<Vec<String>> {
    let mut fields: Vec<String> = fs::read_dir(source_dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    fields.sort();
    Ok(fields)
}
