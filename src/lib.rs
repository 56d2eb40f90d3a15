//! LAS Harmonizer: well-log canonicalisation
//!
//! Batch pipeline that turns archives of raw LAS well logs into one
//! canonical document per well.
//!
//! ## Architecture
//!
//! - **Catalog**: per-field reference tables and file-name to well identity
//! - **Header**: canonical `~Well` section synthesized from metadata
//! - **Merge**: curves from later logs of the same well, resampled onto the
//!   first log's depth index
//! - **Formation**: formation-top intervals embedded in `~Other`
//! - **Pipeline**: archive extraction, bounded worker pool, cancellation
//! - **Reporting**: single-writer error ledger

pub mod catalog;
pub mod config;
pub mod error;
pub mod formation;
pub mod header;
pub mod las;
pub mod merge;
pub mod pipeline;
pub mod reporting;
pub mod types;

// Re-export configuration
pub use config::HarmonizerConfig;

// Re-export commonly used types
pub use types::{
    Curve, FormationInterval, HeaderItem, HeaderSection, LasDocument, OutputKey, WellId,
};

pub use catalog::{MetadataCatalog, WellIdentityResolver};
pub use error::PipelineError;
pub use formation::{FormationIntervalBuilder, FormationTable};
pub use header::HeaderSynthesizer;
pub use las::LasWriter;
pub use merge::CurveMergeEngine;
pub use pipeline::{BatchOrchestrator, RunSummary};
pub use reporting::{ErrorKind, ErrorLedger, ErrorReporter, ErrorReporterHandle};
