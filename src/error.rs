//! Pipeline errors
//!
//! Every stage returns a [`PipelineError`]; the orchestrator maps it to an
//! [`ErrorKind`] with [`PipelineError::kind`] before handing it to the
//! error reporter.

use crate::las::LasError;
use crate::reporting::ErrorKind;
use crate::types::WellId;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no KID found for {file} in the index table")]
    IdentityNotFound { file: String },

    #[error("no {table} record for KID {kid}")]
    MetadataJoin { kid: WellId, table: &'static str },

    #[error(transparent)]
    Parse(#[from] LasError),

    #[error("document has no data rows")]
    EmptyData,

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("processing did not finish within {}s", limit.as_secs())]
    TimedOut { limit: Duration },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::IdentityNotFound { .. } => ErrorKind::IdentityResolutionError,
            PipelineError::MetadataJoin { .. } => ErrorKind::MetadataJoinError,
            PipelineError::Parse(_) => ErrorKind::ParseError,
            PipelineError::EmptyData => ErrorKind::EmptyDataError,
            PipelineError::Write { .. } => ErrorKind::WriteError,
            PipelineError::Panicked(_) => ErrorKind::TaskPanicked,
            PipelineError::TimedOut { .. } => ErrorKind::TimeoutError,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            PipelineError::IdentityNotFound { file: "a.las".into() }.kind(),
            ErrorKind::IdentityResolutionError
        );
        assert_eq!(PipelineError::EmptyData.kind(), ErrorKind::EmptyDataError);
        assert_eq!(
            PipelineError::from(LasError::MissingCurves).kind(),
            ErrorKind::ParseError
        );
        assert_eq!(
            PipelineError::Panicked("boom".into()).kind(),
            ErrorKind::TaskPanicked
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = PipelineError::TimedOut {
            limit: Duration::from_secs(300),
        };
        assert_eq!(err.kind(), ErrorKind::TimeoutError);
        assert_eq!(err.to_string(), "processing did not finish within 300s");
    }

    #[test]
    fn test_join_message_names_kid() {
        let err = PipelineError::MetadataJoin {
            kid: WellId::new("1044"),
            table: "wells",
        };
        assert_eq!(err.to_string(), "no wells record for KID 1044");
    }
}
