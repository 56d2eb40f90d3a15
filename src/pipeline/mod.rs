//! Batch pipeline
//!
//! ```text
//! source_dir/<field>/*.zip ──► scratch (per field, removed on drop)
//!                                   │ discover *.las
//!                                   ▼
//!              plan: identity ─► metadata join ─► group by output key
//!                                   │
//!                       Semaphore-bounded blocking workers
//!                                   │ one worker per output key
//!                                   ▼
//!     read ─► header synthesis ─► formation table ─► merge ─► atomic write
//!                                   │
//!                 failures ──► ErrorReporterHandle ──► ledger
//! ```

mod archive;
mod orchestrator;
mod progress;
mod task;

pub use archive::{discover_logs, extract_archive, list_archives, scratch_dir, ArchiveError};
pub use orchestrator::{BatchOrchestrator, FieldStatus, FieldSummary, GroupProcessor, RunSummary};
pub use progress::FieldProgress;
pub use task::{
    plan_field, process_group, FieldContext, FieldPlan, FileState, FileTask, GroupOutcome,
    OutputTarget, PlannedFile,
};
