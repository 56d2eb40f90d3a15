//! On-disk error ledger
//!
//! JSON object keyed by field name; each value is an array of
//! `{file, error, message}` records. The file is read once when the ledger is
//! opened and rewritten as a whole on `persist`, so entries from earlier runs
//! are carried forward. A file that is not valid JSON is moved aside to
//! `<path>.corrupt` rather than overwritten.

use super::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub file: String,
    pub error: ErrorKind,
    pub message: String,
}

/// Append-only, per-field, deduplicated error ledger.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    path: PathBuf,
    fields: BTreeMap<String, Vec<LedgerEntry>>,
    /// Per-field index of `fields` for constant-time duplicate checks
    seen: HashMap<String, HashSet<LedgerEntry>>,
    /// Entries appended since the last successful persist
    dirty: usize,
}

impl ErrorLedger {
    /// Open the ledger at `path`, loading any existing content.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let fields = read_existing(&path);
        let seen = fields
            .iter()
            .map(|(field, entries)| (field.clone(), entries.iter().cloned().collect()))
            .collect();
        Self {
            path,
            fields,
            seen,
            dirty: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry unless an identical `(file, error, message)` record
    /// already exists for the field. Returns whether it was appended.
    pub fn append(&mut self, field: &str, entry: LedgerEntry) -> bool {
        let seen = self.seen.entry(field.to_string()).or_default();
        if !seen.insert(entry.clone()) {
            return false;
        }
        self.fields.entry(field.to_string()).or_default().push(entry);
        self.dirty += 1;
        true
    }

    /// Number of entries appended since the last successful persist.
    pub fn pending(&self) -> usize {
        self.dirty
    }

    /// Write the ledger back to disk if anything was appended since the last
    /// persist. The write goes through a temporary file and a rename.
    pub fn persist(&mut self) -> io::Result<()> {
        if self.dirty == 0 {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.fields)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = self.dirty, "Error ledger persisted");
        self.dirty = 0;
        Ok(())
    }

    pub fn entries(&self, field: &str) -> &[LedgerEntry] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    pub fn total_entries(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }
}

/// Sibling path a corrupt ledger is moved to.
fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt");
    PathBuf::from(name)
}

fn read_existing(path: &Path) -> BTreeMap<String, Vec<LedgerEntry>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read existing error ledger, starting fresh");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(fields) => fields,
        Err(e) => {
            let aside = corrupt_path(path);
            match fs::rename(path, &aside) {
                Ok(()) => warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Existing error ledger is not valid JSON, moved aside and starting fresh"
                ),
                Err(rename_err) => warn!(
                    path = %path.display(),
                    error = %e,
                    rename_error = %rename_err,
                    "Existing error ledger is not valid JSON and could not be moved aside"
                ),
            }
            BTreeMap::new()
        }
    }
}
