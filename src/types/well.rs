//! Well identity and reference-table records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque well identity (`KID`) joining every reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WellId(String);

impl WellId {
    /// Build an identity from a raw table cell. Surrounding whitespace is not
    /// part of the key.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the `Wells_` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WellMetadataRecord {
    pub kid: WellId,
    pub lease_name: String,
    pub well_name: String,
    pub api: Option<String>,
    pub field_name: Option<String>,
    pub county: Option<String>,
    pub township: Option<String>,
    pub operator: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub location: Option<String>,
    pub elevation: Option<String>,
    pub elevation_reference: Option<String>,
    pub producing_formation: Option<String>,
}

/// One row of the `Logs_` table (a single logging run).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogRunRecord {
    pub kid: WellId,
    pub logger: Option<String>,
    pub log_date: Option<String>,
    pub top_depth: Option<f64>,
    pub bottom_depth: Option<f64>,
    pub location: Option<String>,
}

/// One raw row of the `Tops_` table. Rows arrive unsorted and may overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationTopRecord {
    pub kid: WellId,
    pub top: f64,
    pub base: Option<f64>,
    pub formation: String,
}

/// Reference columns a header field can be sourced from.
///
/// Lookups go through [`MetadataSource`] so the synthesizer can fall back from
/// the well record to the log-run record column by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceColumn {
    Api,
    LeaseName,
    WellName,
    Latitude,
    Longitude,
    Location,
    FieldName,
    County,
    Township,
    Elevation,
    ElevationReference,
    Operator,
    Logger,
    ProducingFormation,
    LogDate,
}

impl SourceColumn {
    /// Column header as it appears in the reference CSV tables.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::LeaseName => "LEASE_NAME",
            Self::WellName => "WELL_NAME",
            Self::Latitude => "NAD27_LATITUDE",
            Self::Longitude => "NAD27_LONGITUDE",
            Self::Location => "LOCATION",
            Self::FieldName => "FIELD_NAME",
            Self::County => "COUNTY",
            Self::Township => "TOWNSHIP",
            Self::Elevation => "ELEVATION",
            Self::ElevationReference => "ELEVATION_REFERENCE",
            Self::Operator => "CURR_OPERATOR",
            Self::Logger => "LOGGER",
            Self::ProducingFormation => "PRODUCING_FORMATION",
            Self::LogDate => "LOG_DATE",
        }
    }
}

/// A record that can supply header values by reference column.
pub trait MetadataSource {
    fn lookup(&self, column: SourceColumn) -> Option<&str>;
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl MetadataSource for WellMetadataRecord {
    fn lookup(&self, column: SourceColumn) -> Option<&str> {
        match column {
            SourceColumn::Api => non_empty(&self.api),
            SourceColumn::LeaseName => Some(self.lease_name.trim()).filter(|v| !v.is_empty()),
            SourceColumn::WellName => Some(self.well_name.trim()).filter(|v| !v.is_empty()),
            SourceColumn::Latitude => non_empty(&self.latitude),
            SourceColumn::Longitude => non_empty(&self.longitude),
            SourceColumn::Location => non_empty(&self.location),
            SourceColumn::FieldName => non_empty(&self.field_name),
            SourceColumn::County => non_empty(&self.county),
            SourceColumn::Township => non_empty(&self.township),
            SourceColumn::Elevation => non_empty(&self.elevation),
            SourceColumn::ElevationReference => non_empty(&self.elevation_reference),
            SourceColumn::Operator => non_empty(&self.operator),
            SourceColumn::ProducingFormation => non_empty(&self.producing_formation),
            SourceColumn::Logger | SourceColumn::LogDate => None,
        }
    }
}

impl MetadataSource for LogRunRecord {
    fn lookup(&self, column: SourceColumn) -> Option<&str> {
        match column {
            SourceColumn::Logger => non_empty(&self.logger),
            SourceColumn::LogDate => non_empty(&self.log_date),
            SourceColumn::Location => non_empty(&self.location),
            _ => None,
        }
    }
}

/// Deterministic output address of a merged well document.
///
/// Derived from lease and well names: spaces become `_`, `/` becomes `-`, and
/// every `_`-separated word is title-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputKey(String);

impl OutputKey {
    pub fn from_names(lease_name: &str, well_name: &str) -> Self {
        Self(format!(
            "{}_{}",
            title_case_path_part(lease_name),
            title_case_path_part(well_name)
        ))
    }

    pub fn file_name(&self) -> String {
        format!("{}.las", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn title_case_path_part(raw: &str) -> String {
    let sanitized = raw.trim().replace(' ', "_").replace('/', "-");
    let mut out = String::with_capacity(sanitized.len());
    let mut at_word_start = true;
    for ch in sanitized.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
