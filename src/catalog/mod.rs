//! Reference metadata for one field
//!
//! [`MetadataCatalog`] loads the four per-field CSV tables (wells, log runs,
//! formation tops and the file-name index) once, indexes them by [`WellId`]
//! and is immutable for the rest of the field's batch. A table that is
//! absent, unreadable or empty fails the whole field.

mod resolver;
mod tables;

pub use resolver::{normalise_file_name, WellIdentityResolver};
pub use tables::{load_index, load_logs, load_tops, load_wells, IndexEntry};

use crate::config::TablesConfig;
use crate::error::PipelineError;
use crate::reporting::ErrorKind;
use crate::types::{FormationTopRecord, LogRunRecord, WellId, WellMetadataRecord};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no {prefix}*.csv table in {}", dir.display())]
    MissingTable { prefix: String, dir: PathBuf },

    #[error("table {} has no data rows", path.display())]
    EmptyTable { path: PathBuf },

    #[error("cannot list tables in {}: {source}", dir.display())]
    DirUnreadable {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read table {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("table {} lacks required column {column}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::MissingColumn { .. } => ErrorKind::SchemaError,
            _ => ErrorKind::MetadataMissingError,
        }
    }
}

/// Metadata joined for one resolved well.
#[derive(Debug, Clone, Copy)]
pub struct WellContext<'a> {
    pub kid: &'a WellId,
    pub well: &'a WellMetadataRecord,
    pub log_run: &'a LogRunRecord,
    pub tops: &'a [FormationTopRecord],
}

#[derive(Debug, Default)]
pub struct MetadataCatalog {
    wells: HashMap<WellId, WellMetadataRecord>,
    logs: HashMap<WellId, LogRunRecord>,
    tops: HashMap<WellId, Vec<FormationTopRecord>>,
    identity_index: HashMap<String, WellId>,
}

impl MetadataCatalog {
    /// Load the four tables of one field from `tables_dir`.
    pub fn load(tables_dir: &Path, prefixes: &TablesConfig) -> Result<Self, CatalogError> {
        let wells = load_wells(&find_table(tables_dir, &prefixes.wells_prefix)?)?;
        let logs = load_logs(&find_table(tables_dir, &prefixes.logs_prefix)?)?;
        let tops = load_tops(&find_table(tables_dir, &prefixes.tops_prefix)?)?;
        let index = load_index(&find_table(tables_dir, &prefixes.index_prefix)?)?;

        let catalog = Self::from_records(wells, logs, tops, index);
        info!(
            dir = %tables_dir.display(),
            wells = catalog.wells.len(),
            log_runs = catalog.logs.len(),
            indexed_files = catalog.identity_index.len(),
            "Metadata catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-decoded rows. The first row for a given
    /// key wins; later duplicates are ignored.
    pub fn from_records(
        wells: Vec<WellMetadataRecord>,
        logs: Vec<LogRunRecord>,
        tops: Vec<FormationTopRecord>,
        index: Vec<IndexEntry>,
    ) -> Self {
        let mut catalog = Self::default();
        for well in wells {
            catalog.wells.entry(well.kid.clone()).or_insert(well);
        }
        for run in logs {
            catalog.logs.entry(run.kid.clone()).or_insert(run);
        }
        for top in tops {
            catalog.tops.entry(top.kid.clone()).or_default().push(top);
        }
        for entry in index {
            let key = normalise_file_name(&entry.las_file);
            if catalog.identity_index.contains_key(&key) {
                debug!(file = %entry.las_file, "Duplicate index entry ignored");
                continue;
            }
            catalog.identity_index.insert(key, entry.kid);
        }
        catalog
    }

    pub fn well(&self, kid: &WellId) -> Option<&WellMetadataRecord> {
        self.wells.get(kid)
    }

    pub fn log_run(&self, kid: &WellId) -> Option<&LogRunRecord> {
        self.logs.get(kid)
    }

    pub fn tops(&self, kid: &WellId) -> &[FormationTopRecord] {
        self.tops.get(kid).map_or(&[], Vec::as_slice)
    }

    pub fn resolver(&self) -> WellIdentityResolver<'_> {
        WellIdentityResolver::new(&self.identity_index)
    }

    /// Join the well and log-run records of a resolved identity.
    pub fn join<'a>(&'a self, kid: &'a WellId) -> Result<WellContext<'a>, PipelineError> {
        let well = self.well(kid).ok_or_else(|| PipelineError::MetadataJoin {
            kid: kid.clone(),
            table: "wells",
        })?;
        let log_run = self.log_run(kid).ok_or_else(|| PipelineError::MetadataJoin {
            kid: kid.clone(),
            table: "logs",
        })?;
        Ok(WellContext {
            kid,
            well,
            log_run,
            tops: self.tops(kid),
        })
    }
}

/// First CSV file (by name) in `dir` whose name starts with `prefix`.
fn find_table(dir: &Path, prefix: &str) -> Result<PathBuf, CatalogError> {
    let entries = fs::read_dir(dir).map_err(|source| CatalogError::DirUnreadable {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name_matches = p
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix));
            let is_csv = p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            name_matches && is_csv
        })
        .collect();
    candidates.sort();

    let path = candidates
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::MissingTable {
            prefix: prefix.to_string(),
            dir: dir.to_path_buf(),
        })?;

    if is_empty_table(&path) {
        return Err(CatalogError::EmptyTable { path });
    }
    Ok(path)
}

/// A table with no bytes or only a header row.
fn is_empty_table(path: &Path) -> bool {
    match fs::read_to_string(path) {
        Ok(contents) => contents.lines().filter(|l| !l.trim().is_empty()).count() < 2,
        // Unreadable files surface as `Unreadable` when the csv reader opens them
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tables(dir: &Path, skip: Option<&str>) {
        let tables = [
            ("Wells_field.csv", "KID,LEASE_NAME,WELL_NAME\n1,Smith,1\n1,Dup,9\n"),
            ("Logs_field.csv", "KID,LOGGER\n1,Acme\n"),
            ("Tops_field.csv", "KID,TOP,BASE,FORMATION\n1,1000,,A\n"),
            ("LAS_field.csv", "KID,LASFILE\n1,smith_1.las\n2,smith_1.LAS\n"),
        ];
        for (name, contents) in tables {
            if Some(name) != skip {
                fs::write(dir.join(name), contents).unwrap();
            }
        }
    }

    #[test]
    fn test_load_full_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        write_tables(tmp.path(), None);
        let catalog = MetadataCatalog::load(tmp.path(), &TablesConfig::default()).unwrap();

        let kid = WellId::new("1");
        // First row wins
        assert_eq!(catalog.well(&kid).unwrap().lease_name, "Smith");
        assert_eq!(catalog.tops(&kid).len(), 1);
        assert_eq!(catalog.resolver().resolve("smith_1.las"), Some(&kid));
    }

    #[test]
    fn test_missing_wells_table() {
        let tmp = tempfile::tempdir().unwrap();
        write_tables(tmp.path(), Some("Wells_field.csv"));
        let err = MetadataCatalog::load(tmp.path(), &TablesConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingTable { .. }));
        assert_eq!(err.kind(), ErrorKind::MetadataMissingError);
    }

    #[test]
    fn test_header_only_table_counts_as_missing() {
        let tmp = tempfile::tempdir().unwrap();
        write_tables(tmp.path(), None);
        fs::write(tmp.path().join("Logs_field.csv"), "KID,LOGGER\n").unwrap();
        let err = MetadataCatalog::load(tmp.path(), &TablesConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyTable { .. }));
        assert_eq!(err.kind(), ErrorKind::MetadataMissingError);
    }

    #[test]
    fn test_schema_error_kind() {
        let tmp = tempfile::tempdir().unwrap();
        write_tables(tmp.path(), None);
        fs::write(tmp.path().join("Tops_field.csv"), "KID,DEPTH,NAME\n1,1000,A\n").unwrap();
        let err = MetadataCatalog::load(tmp.path(), &TablesConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaError);
    }

    #[test]
    fn test_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let err = MetadataCatalog::load(&tmp.path().join("nope"), &TablesConfig::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::DirUnreadable { .. }));
    }

    #[test]
    fn test_join_reports_missing_log_run() {
        let catalog = MetadataCatalog::from_records(
            vec![WellMetadataRecord {
                kid: WellId::new("5"),
                ..Default::default()
            }],
            vec![],
            vec![],
            vec![],
        );
        let kid = WellId::new("5");
        match catalog.join(&kid) {
            Err(PipelineError::MetadataJoin { table, .. }) => assert_eq!(table, "logs"),
            other => panic!("expected join error, got {:?}", other.map(|c| c.kid.clone())),
        }
    }
}
