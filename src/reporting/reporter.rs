//! Error reporter actor - single writer for the error ledger

use super::ledger::{ErrorLedger, LedgerEntry};
use super::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Appended entries buffered before the ledger is rewritten.
pub const PERSIST_BATCH: usize = 64;

// ============================================================================
// Commands
// ============================================================================

/// A failure to be recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub field: String,
    pub file: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug)]
enum ReporterCommand {
    Report(ErrorReport),
    Flush {
        response_tx: oneshot::Sender<LedgerStats>,
    },
}

/// Counters kept by the reporter for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// New entries written this run
    pub appended: usize,
    /// Reports dropped because an identical entry already existed
    pub duplicates: usize,
    /// Persist attempts that failed
    pub write_failures: usize,
}

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("error reporter has shut down")]
    Closed,
}

// ============================================================================
// Actor Handle
// ============================================================================

/// Cloneable handle used by workers to submit reports.
///
/// `report` never blocks or awaits, so it can be called from blocking worker
/// threads as well as async tasks.
#[derive(Clone)]
pub struct ErrorReporterHandle {
    tx: mpsc::UnboundedSender<ReporterCommand>,
}

impl ErrorReporterHandle {
    /// Record a failure for `file` under `field`.
    pub fn report(&self, field: &str, file: &str, kind: ErrorKind, message: impl Into<String>) {
        let report = ErrorReport {
            field: field.to_string(),
            file: file.to_string(),
            kind,
            message: message.into(),
        };
        warn!(
            field = %report.field,
            file = %report.file,
            kind = %report.kind,
            "{}",
            report.message
        );
        if self.tx.send(ReporterCommand::Report(report)).is_err() {
            error!("Error reporter channel closed, report lost");
        }
    }

    /// Wait until every report sent before this call has been persisted.
    pub async fn flush(&self) -> Result<LedgerStats, ReporterError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(ReporterCommand::Flush { response_tx })
            .map_err(|_| ReporterError::Closed)?;
        response_rx.await.map_err(|_| ReporterError::Closed)
    }
}

// ============================================================================
// Error Reporter
// ============================================================================

/// Owns the ledger; runs on a dedicated blocking thread.
pub struct ErrorReporter {
    ledger: ErrorLedger,
    rx: mpsc::UnboundedReceiver<ReporterCommand>,
    stats: LedgerStats,
}

impl ErrorReporter {
    /// Create the reporter and its handle. The ledger at `path` is loaded
    /// immediately so existing entries take part in deduplication.
    pub fn new(path: impl Into<PathBuf>) -> (Self, ErrorReporterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self {
            ledger: ErrorLedger::open(path),
            rx,
            stats: LedgerStats::default(),
        };
        (reporter, ErrorReporterHandle { tx })
    }

    /// Spawn the reporter on the blocking pool. The task ends once every
    /// handle has been dropped and yields the final counters.
    pub fn spawn(path: impl Into<PathBuf>) -> (ErrorReporterHandle, JoinHandle<LedgerStats>) {
        let (reporter, handle) = Self::new(path);
        let task = tokio::task::spawn_blocking(move || reporter.run());
        (handle, task)
    }

    /// Process commands until the channel closes.
    pub fn run(mut self) -> LedgerStats {
        info!(path = %self.ledger.path().display(), "Error reporter starting");

        while let Some(cmd) = self.rx.blocking_recv() {
            match cmd {
                ReporterCommand::Report(report) => self.handle_report(report),
                ReporterCommand::Flush { response_tx } => {
                    self.persist();
                    let _ = response_tx.send(self.stats);
                }
            }
        }
        self.persist();

        info!(
            appended = self.stats.appended,
            duplicates = self.stats.duplicates,
            "Error reporter stopped"
        );
        self.stats
    }

    fn handle_report(&mut self, report: ErrorReport) {
        let entry = LedgerEntry {
            file: report.file,
            error: report.kind,
            message: report.message,
        };
        if !self.ledger.append(&report.field, entry) {
            self.stats.duplicates += 1;
            debug!(field = %report.field, "Duplicate ledger entry ignored");
            return;
        }
        self.stats.appended += 1;

        if self.ledger.pending() >= PERSIST_BATCH {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.ledger.persist() {
            self.stats.write_failures += 1;
            error!(
                path = %self.ledger.path().display(),
                error = %e,
                "Failed to persist error ledger"
            );
        }
    }
}
