//! LAS 2.0 codec
//!
//! Turns raw log text into a [`LasDocument`](crate::types::LasDocument) and
//! back. Only the sections the pipeline emits are kept: Version, Well, Curve,
//! Parameter, Other and ASCII. Unknown sections are skipped on read.

mod reader;
mod writer;

pub use reader::{parse_str, read_path};
pub use writer::LasWriter;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LasError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("document has no curve definitions")]
    MissingCurves,

    #[error("data section has {values} values, not a multiple of {columns} columns")]
    RaggedData { values: usize, columns: usize },

    #[error("depth index is not monotonic at row {row} ({previous} followed by {depth})")]
    NonMonotonicIndex { row: usize, previous: f64, depth: f64 },
}
