//! Error reporting
//!
//! Every file-level and field-level failure is tagged with an [`ErrorKind`]
//! and forwarded to a single-writer ledger actor ([`ErrorReporter`]). Workers
//! only hold a cloneable [`ErrorReporterHandle`]; the ledger file is touched
//! by exactly one thread.

mod ledger;
mod reporter;

pub use ledger::{ErrorLedger, LedgerEntry};
pub use reporter::{ErrorReport, ErrorReporter, ErrorReporterHandle, LedgerStats, ReporterError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a pipeline failure, as recorded in the ledger.
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No identity match for a source file.
    IdentityResolutionError,
    /// A required reference table is absent, empty or unreadable for a field.
    MetadataMissingError,
    /// No well or log-run record for a resolved identity.
    MetadataJoinError,
    /// A reference table lacks a required column.
    SchemaError,
    /// Malformed source document.
    ParseError,
    /// Zero-length curve data.
    EmptyDataError,
    /// Corrupt or unreadable archive.
    ArchiveError,
    /// Output I/O failure.
    WriteError,
    /// A worker panicked while processing the file.
    TaskPanicked,
    /// Processing did not finish within the configured per-file time limit.
    TimeoutError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdentityResolutionError => "IdentityResolutionError",
            Self::MetadataMissingError => "MetadataMissingError",
            Self::MetadataJoinError => "MetadataJoinError",
            Self::SchemaError => "SchemaError",
            Self::ParseError => "ParseError",
            Self::EmptyDataError => "EmptyDataError",
            Self::ArchiveError => "ArchiveError",
            Self::WriteError => "WriteError",
            Self::TaskPanicked => "TaskPanicked",
            Self::TimeoutError => "TimeoutError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
