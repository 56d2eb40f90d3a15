//! Per-file processing
//!
//! A file moves through these states; every failure is terminal for that
//! file only:
//!
//! ```text
//! Discovered ─► IdentityResolved ─► MetadataJoined ─► HeaderSynthesized
//!     │               │                                      │
//!     ▼               ▼                                      ▼
//! IdentityFailed  MetadataMissing                      CurveSetBuilt
//!                                                            │
//!                                     OutputResolved(New | MergeIntoExisting)
//!                                                            │
//!                                                  Written / WriteFailed
//! ```
//!
//! Identity and metadata are resolved while planning (they decide the output
//! key). Everything after runs on a blocking worker that owns one output key,
//! so writes to the same target are serialised.

use crate::catalog::MetadataCatalog;
use crate::error::{PipelineError, Result};
use crate::formation::{FormationIntervalBuilder, FormationTable};
use crate::header::HeaderSynthesizer;
use crate::las::{self, LasWriter};
use crate::merge::CurveMergeEngine;
use crate::reporting::{ErrorKind, ErrorReporterHandle};
use crate::types::{LasDocument, OutputKey, WellId};
use std::collections::BTreeMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::progress::FieldProgress;

// ============================================================================
// File state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    New,
    MergeIntoExisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Discovered,
    IdentityResolved,
    IdentityFailed,
    MetadataJoined,
    MetadataMissing,
    HeaderSynthesized,
    CurveSetBuilt,
    OutputResolved(OutputTarget),
    Written,
    WriteFailed,
    Failed(ErrorKind),
}

impl FileState {
    /// Terminal state reached when `error` stops a file.
    pub fn for_error(error: &PipelineError) -> Self {
        match error.kind() {
            ErrorKind::IdentityResolutionError => FileState::IdentityFailed,
            ErrorKind::MetadataJoinError => FileState::MetadataMissing,
            ErrorKind::WriteError => FileState::WriteFailed,
            kind => FileState::Failed(kind),
        }
    }
}

/// One discovered log file and its position in the state machine.
#[derive(Debug)]
pub struct FileTask {
    pub path: PathBuf,
    pub file_name: String,
    state: FileState,
}

impl FileTask {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            state: FileState::Discovered,
        }
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    fn advance(&mut self, next: FileState) {
        debug!(file = %self.file_name, from = ?self.state, to = ?next, "File state");
        self.state = next;
    }

    fn fail(&mut self, error: &PipelineError) {
        self.advance(FileState::for_error(error));
    }
}

/// A file whose identity and metadata resolved, waiting for its worker.
#[derive(Debug)]
pub struct PlannedFile {
    pub task: FileTask,
    pub kid: WellId,
}

// ============================================================================
// Planning
// ============================================================================

/// Files grouped by output key. Within a group files keep discovery order,
/// so the lexically first file becomes the merge base.
#[derive(Debug, Default)]
pub struct FieldPlan {
    pub groups: BTreeMap<OutputKey, Vec<PlannedFile>>,
    pub rejected: usize,
}

impl FieldPlan {
    pub fn planned_files(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Resolve identity and join metadata for every discovered file. Files that
/// fail either step are reported and left out of the plan.
pub fn plan_field(
    field: &str,
    files: Vec<PathBuf>,
    catalog: &MetadataCatalog,
    reporter: &ErrorReporterHandle,
) -> FieldPlan {
    let resolver = catalog.resolver();
    let mut plan = FieldPlan::default();

    for path in files {
        let mut task = FileTask::new(path);

        let Some(kid) = resolver.resolve(&task.file_name) else {
            let err = PipelineError::IdentityNotFound {
                file: task.file_name.clone(),
            };
            task.fail(&err);
            reporter.report(field, &task.file_name, err.kind(), err.to_string());
            plan.rejected += 1;
            continue;
        };
        task.advance(FileState::IdentityResolved);

        let key = match catalog.join(kid) {
            Ok(ctx) => OutputKey::from_names(&ctx.well.lease_name, &ctx.well.well_name),
            Err(err) => {
                task.fail(&err);
                reporter.report(field, &task.file_name, err.kind(), err.to_string());
                plan.rejected += 1;
                continue;
            }
        };
        task.advance(FileState::MetadataJoined);

        plan.groups.entry(key).or_default().push(PlannedFile {
            task,
            kid: kid.clone(),
        });
    }

    plan
}

// ============================================================================
// Group worker
// ============================================================================

/// Everything a worker needs to process groups of one field.
pub struct FieldContext {
    pub field: String,
    pub catalog: MetadataCatalog,
    pub destination: PathBuf,
    pub synthesizer: HeaderSynthesizer,
    pub writer: LasWriter,
    pub reporter: ErrorReporterHandle,
    pub progress: Arc<FieldProgress>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupOutcome {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

struct FileOutcome {
    document: LasDocument,
    target: OutputTarget,
    written: bool,
}

/// Process every file of one output key in order. Runs on a blocking
/// thread; a panic while processing one file is caught and reported for that
/// file alone.
pub fn process_group(ctx: &FieldContext, key: &OutputKey, files: Vec<PlannedFile>) -> GroupOutcome {
    let target_path = ctx.destination.join(key.file_name());
    let mut target = load_existing(ctx, &target_path);
    let mut outcome = GroupOutcome::default();

    for PlannedFile { mut task, kid } in files {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            process_file(ctx, &mut task, &kid, target.as_ref(), &target_path)
        }))
        .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(file) => {
                if file.written {
                    outcome.written += 1;
                } else {
                    outcome.unchanged += 1;
                }
                debug!(file = %task.file_name, key = %key, target = ?file.target, "File done");
                target = Some(file.document);
            }
            Err(err) => {
                task.fail(&err);
                ctx.reporter
                    .report(&ctx.field, &task.file_name, err.kind(), err.to_string());
                outcome.failed += 1;
            }
        }
        ctx.progress.complete();
    }

    outcome
}

/// An output left by an earlier run becomes the merge base, so re-running a
/// field only adds curves that are still missing.
fn load_existing(ctx: &FieldContext, target_path: &Path) -> Option<LasDocument> {
    if !target_path.is_file() {
        return None;
    }
    match las::read_path(target_path) {
        Ok(doc) => {
            debug!(path = %target_path.display(), "Merging into existing output");
            Some(doc)
        }
        Err(err) => {
            let file = target_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            warn!(path = %target_path.display(), error = %err, "Existing output unreadable, replacing it");
            ctx.reporter
                .report(&ctx.field, &file, ErrorKind::ParseError, err.to_string());
            None
        }
    }
}

fn process_file(
    ctx: &FieldContext,
    task: &mut FileTask,
    kid: &WellId,
    target: Option<&LasDocument>,
    target_path: &Path,
) -> Result<FileOutcome> {
    let mut doc = las::read_path(&task.path)?;
    if doc.row_count() == 0 {
        return Err(PipelineError::EmptyData);
    }

    // Formation intervals span the source's declared depth range, falling
    // back to the data range when the header is blank or unparseable.
    let (start, stop) = interval_bounds(&doc);

    let well = ctx.catalog.join(kid)?;
    ctx.synthesizer.synthesize(&mut doc, well.well, well.log_run);
    task.advance(FileState::HeaderSynthesized);

    let intervals = FormationIntervalBuilder::build(well.tops, start, stop);
    doc.other = FormationTable::new(intervals)
        .to_text()
        .map_err(|e| PipelineError::Write {
            path: target_path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
    task.advance(FileState::CurveSetBuilt);

    let (document, kind, changed) = match target {
        None => (doc, OutputTarget::New, true),
        Some(existing) => {
            let mut merged = existing.clone();
            let report = CurveMergeEngine::merge_into(&mut merged, &doc);
            (merged, OutputTarget::MergeIntoExisting, !report.is_noop())
        }
    };
    task.advance(FileState::OutputResolved(kind));

    if changed || !target_path.exists() {
        ctx.writer
            .write_atomic(&document, target_path)
            .map_err(|source| PipelineError::Write {
                path: target_path.to_path_buf(),
                source,
            })?;
        info!(file = %task.file_name, output = %target_path.display(), target = ?kind, "Output written");
    }
    task.advance(FileState::Written);

    Ok(FileOutcome {
        document,
        target: kind,
        written: changed,
    })
}

fn interval_bounds(doc: &LasDocument) -> (f64, f64) {
    let (lo, hi) = doc.depth_range().unwrap_or((0.0, 0.0));
    let start = doc.well_f64("STRT").filter(|v| v.is_finite()).unwrap_or(lo);
    let stop = doc.well_f64("STOP").filter(|v| v.is_finite()).unwrap_or(hi);
    (start.min(stop), start.max(stop))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IndexEntry;
    use crate::reporting::ErrorReporter;
    use crate::types::{Curve, FormationTopRecord, LogRunRecord, WellMetadataRecord};

    fn catalog() -> MetadataCatalog {
        let wells = vec![
            WellMetadataRecord {
                kid: WellId::new("1"),
                lease_name: "smith".into(),
                well_name: "1".into(),
                ..Default::default()
            },
            WellMetadataRecord {
                kid: WellId::new("2"),
                lease_name: "jones".into(),
                well_name: "2".into(),
                ..Default::default()
            },
        ];
        let logs = vec![LogRunRecord {
            kid: WellId::new("1"),
            logger: Some("Acme".into()),
            ..Default::default()
        }];
        let tops = vec![FormationTopRecord {
            kid: WellId::new("1"),
            top: 1001.0,
            base: None,
            formation: "Lansing".into(),
        }];
        let index = vec![
            IndexEntry {
                kid: WellId::new("1"),
                las_file: "a.las".into(),
            },
            IndexEntry {
                kid: WellId::new("1"),
                las_file: "b.las".into(),
            },
            IndexEntry {
                kid: WellId::new("2"),
                las_file: "c.las".into(),
            },
        ];
        MetadataCatalog::from_records(wells, logs, tops, index)
    }

    fn write_las(dir: &Path, name: &str, curve: &str, values: [f64; 3]) -> PathBuf {
        let doc = LasDocument {
            index: Curve::new("DEPT", "F", vec![1000.0, 1001.0, 1002.0]),
            curves: vec![Curve::new(curve, "", values.to_vec())],
            ..Default::default()
        };
        let path = dir.join(name);
        LasWriter::default().write_atomic(&doc, &path).unwrap();
        path
    }

    #[test]
    fn test_state_for_error() {
        assert_eq!(
            FileState::for_error(&PipelineError::IdentityNotFound { file: "x".into() }),
            FileState::IdentityFailed
        );
        assert_eq!(
            FileState::for_error(&PipelineError::EmptyData),
            FileState::Failed(ErrorKind::EmptyDataError)
        );
    }

    #[test]
    fn test_interval_bounds_fall_back_to_data_range() {
        let mut doc = LasDocument {
            index: Curve::new("DEPT", "F", vec![10.0, 20.0]),
            ..Default::default()
        };
        assert_eq!(interval_bounds(&doc), (10.0, 20.0));
        doc.well.insert(crate::types::HeaderItem::new("STRT", "25"));
        doc.well.insert(crate::types::HeaderItem::new("STOP", "5"));
        assert_eq!(interval_bounds(&doc), (5.0, 25.0));
    }

    #[tokio::test]
    async fn test_plan_and_process_group() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let ledger = tempfile::tempdir().unwrap();
        let files = vec![
            write_las(src.path(), "a.las", "GR", [1.0, 2.0, 3.0]),
            write_las(src.path(), "b.las", "SP", [4.0, 5.0, 6.0]),
            write_las(src.path(), "c.las", "GR", [0.0, 0.0, 0.0]),
            write_las(src.path(), "orphan.las", "GR", [0.0, 0.0, 0.0]),
        ];
        let (reporter, reporter_task) = ErrorReporter::spawn(ledger.path().join("ledger.json"));

        let catalog = catalog();
        let plan = plan_field("F1", files, &catalog, &reporter);
        // orphan.las has no identity, c.las has no log run
        assert_eq!(plan.rejected, 2);
        assert_eq!(plan.planned_files(), 2);

        let ctx = FieldContext {
            field: "F1".into(),
            catalog,
            destination: dest.path().to_path_buf(),
            synthesizer: HeaderSynthesizer::default(),
            writer: LasWriter::default(),
            reporter: reporter.clone(),
            progress: Arc::new(FieldProgress::new("F1", 4)),
        };
        let FieldPlan { groups, .. } = plan;
        for (key, files) in groups {
            let outcome = process_group(&ctx, &key, files);
            assert_eq!(outcome.written, 2);
            assert_eq!(outcome.failed, 0);
        }

        let out = las::read_path(&dest.path().join("Smith_1.las")).unwrap();
        let names: Vec<&str> = out.curve_mnemonics().collect();
        assert_eq!(names, vec!["GR", "SP"]);
        assert_eq!(out.well.value("LOGGER"), Some("Acme"));
        assert!(out.other.contains("1001.00,1002.00,Lansing"));

        let stats = reporter.flush().await.unwrap();
        assert_eq!(stats.appended, 2);
        drop(ctx);
        drop(reporter);
        reporter_task.await.unwrap();
    }
}
