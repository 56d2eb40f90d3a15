//! Typed loaders for the four reference CSV tables
//!
//! Each table deserializes into a serde row struct. Header names are trimmed
//! and upper-cased before rows are read, so column order and case do not
//! matter. Required columns are checked once against the header row; a
//! missing one fails the load with a schema error instead of yielding empty
//! values later. Rows that cannot be decoded, or that lack a required value,
//! are skipped with a warning.

use super::CatalogError;
use crate::types::{FormationTopRecord, LogRunRecord, WellId, WellMetadataRecord};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

fn normalise_column(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_uppercase()
}

/// Deserialize every row of a table as `R` and keep those `convert` accepts.
fn read_rows<R, T>(
    path: &Path,
    required: &[&'static str],
    convert: impl Fn(R) -> Option<T>,
) -> Result<Vec<T>, CatalogError>
where
    R: DeserializeOwned,
{
    let unreadable = |source| CatalogError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(unreadable)?;

    let headers: csv::StringRecord = reader.headers().map_err(unreadable)?.iter().map(normalise_column).collect();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(CatalogError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }
    reader.set_headers(headers);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.deserialize::<R>().enumerate() {
        match result {
            Ok(row) => match convert(row) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            },
            Err(e) => {
                debug!(path = %path.display(), line = line + 2, error = %e, "Skipping malformed CSV row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "Skipped undecodable reference rows");
    }
    Ok(rows)
}

// ============================================================================
// Row shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
struct WellRow {
    kid: Option<String>,
    lease_name: Option<String>,
    well_name: Option<String>,
    api: Option<String>,
    field_name: Option<String>,
    county: Option<String>,
    township: Option<String>,
    curr_operator: Option<String>,
    #[serde(rename = "NAD27_LATITUDE")]
    latitude: Option<String>,
    #[serde(rename = "NAD27_LONGITUDE")]
    longitude: Option<String>,
    location: Option<String>,
    elevation: Option<String>,
    elevation_reference: Option<String>,
    producing_formation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
struct LogRow {
    kid: Option<String>,
    logger: Option<String>,
    log_date: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    top: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    bottom: Option<f64>,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
struct TopRow {
    kid: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    top: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    base: Option<f64>,
    formation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
struct IndexRow {
    kid: Option<String>,
    lasfile: Option<String>,
}

/// Drop values that are empty after trimming.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Tables
// ============================================================================

/// One row of the file-name index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub kid: WellId,
    pub las_file: String,
}

pub fn load_wells(path: &Path) -> Result<Vec<WellMetadataRecord>, CatalogError> {
    read_rows(path, &["KID", "LEASE_NAME", "WELL_NAME"], |row: WellRow| {
        Some(WellMetadataRecord {
            kid: WellId::new(present(row.kid)?),
            lease_name: present(row.lease_name).unwrap_or_default(),
            well_name: present(row.well_name).unwrap_or_default(),
            api: present(row.api),
            field_name: present(row.field_name),
            county: present(row.county),
            township: present(row.township),
            operator: present(row.curr_operator),
            latitude: present(row.latitude),
            longitude: present(row.longitude),
            location: present(row.location),
            elevation: present(row.elevation),
            elevation_reference: present(row.elevation_reference),
            producing_formation: present(row.producing_formation),
        })
    })
}

pub fn load_logs(path: &Path) -> Result<Vec<LogRunRecord>, CatalogError> {
    read_rows(path, &["KID"], |row: LogRow| {
        Some(LogRunRecord {
            kid: WellId::new(present(row.kid)?),
            logger: present(row.logger),
            log_date: present(row.log_date),
            top_depth: row.top,
            bottom_depth: row.bottom,
            location: present(row.location),
        })
    })
}

pub fn load_tops(path: &Path) -> Result<Vec<FormationTopRecord>, CatalogError> {
    read_rows(path, &["KID", "TOP", "FORMATION"], |row: TopRow| {
        Some(FormationTopRecord {
            kid: WellId::new(present(row.kid)?),
            top: row.top?,
            base: row.base,
            formation: present(row.formation)?,
        })
    })
}

pub fn load_index(path: &Path) -> Result<Vec<IndexEntry>, CatalogError> {
    read_rows(path, &["KID", "LASFILE"], |row: IndexRow| {
        Some(IndexEntry {
            kid: WellId::new(present(row.kid)?),
            las_file: present(row.lasfile)?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_wells_columns_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "Wells_x.csv",
            "WELL_NAME,KID,LEASE_NAME,COUNTY,API\n1-23,1044,Smith,Barton,15-009-00001\n",
        );
        let wells = load_wells(&path).unwrap();
        assert_eq!(wells.len(), 1);
        assert_eq!(wells[0].kid, WellId::new("1044"));
        assert_eq!(wells[0].lease_name, "Smith");
        assert_eq!(wells[0].county.as_deref(), Some("Barton"));
        assert_eq!(wells[0].operator, None);
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "LAS_x.csv", "KID,FILENAME\n1,a.las\n");
        match load_index(&path) {
            Err(CatalogError::MissingColumn { column, .. }) => assert_eq!(column, "LASFILE"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "LAS_x.csv", " kid , LasFile \n7, a.las \n");
        let index = load_index(&path).unwrap();
        assert_eq!(index[0].kid, WellId::new("7"));
        assert_eq!(index[0].las_file, "a.las");
    }

    #[test]
    fn test_tops_skip_rows_without_numeric_top() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "Tops_x.csv",
            "KID,TOP,BASE,FORMATION\n1,1000,,Lansing\n1,n/a,1200,Kansas City\n1,1200,1250,Arbuckle\n",
        );
        let tops = load_tops(&path).unwrap();
        assert_eq!(tops.len(), 2);
        assert_eq!(tops[0].base, None);
        assert_eq!(tops[1].base, Some(1250.0));
    }

    #[test]
    fn test_logs_parse_depths() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "Logs_x.csv",
            "KID,LOGGER,LOG_DATE,TOP,BOTTOM\n1,Schlumberger,1981-03-12,900,1400\n",
        );
        let logs = load_logs(&path).unwrap();
        assert_eq!(logs[0].logger.as_deref(), Some("Schlumberger"));
        assert_eq!(logs[0].top_depth, Some(900.0));
        assert_eq!(logs[0].bottom_depth, Some(1400.0));
    }

    #[test]
    fn test_short_rows_and_extra_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "Wells_x.csv",
            "KID,LEASE_NAME,WELL_NAME,NOTES,NAD27_LATITUDE\n1044,Smith,1,drilled late,38.5\n2001,Jones\n,Orphan,9\n",
        );
        let wells = load_wells(&path).unwrap();
        assert_eq!(wells.len(), 2);
        assert_eq!(wells[0].latitude.as_deref(), Some("38.5"));
        assert_eq!(wells[1].kid, WellId::new("2001"));
        assert_eq!(wells[1].well_name, "");
    }

    #[test]
    fn test_bad_depths_become_none() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "Logs_x.csv", "KID,TOP,BOTTOM\n1,unknown, 1400 \n");
        let logs = load_logs(&path).unwrap();
        assert_eq!(logs[0].top_depth, None);
        assert_eq!(logs[0].bottom_depth, Some(1400.0));
    }
}
