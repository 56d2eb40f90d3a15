//! Canonical header synthesis
//!
//! Rebuilds the `~Well` section of a document from a fixed schema: the
//! mandatory depth/NULL fields first (source values kept, defaults otherwise),
//! then the required identification fields sourced from reference metadata.
//! Anything else in the source header is dropped. Curve mnemonics are split
//! into mnemonic and unit and made unique.
//!
//! Synthesis is idempotent: applying it to its own output with the same
//! metadata yields the same document.

mod mnemonic;

pub use mnemonic::{dedupe_mnemonics, split_mnemonic, MnemonicSplit, SplitRule, SPLIT_RULES};

use crate::types::{
    HeaderItem, HeaderSection, LasDocument, MetadataSource, SourceColumn, DEFAULT_NULL_VALUE,
};
use tracing::debug;

/// Header fields populated from reference metadata, in output order.
pub const REQUIRED_FIELDS: [(&str, SourceColumn); 15] = [
    ("UWI", SourceColumn::Api),
    ("WELL", SourceColumn::WellName),
    ("LEASE", SourceColumn::LeaseName),
    ("LAT", SourceColumn::Latitude),
    ("LONG", SourceColumn::Longitude),
    ("LOC", SourceColumn::Location),
    ("FLD", SourceColumn::FieldName),
    ("CNTY", SourceColumn::County),
    ("PROV", SourceColumn::Township),
    ("ELEV", SourceColumn::Elevation),
    ("EREF", SourceColumn::ElevationReference),
    ("COMP", SourceColumn::Operator),
    ("LOGGER", SourceColumn::Logger),
    ("FORM", SourceColumn::ProducingFormation),
    ("DATE", SourceColumn::LogDate),
];

/// Depth and NULL fields every output carries.
pub const MANDATORY_FIELDS: [&str; 4] = ["STRT", "STOP", "STEP", "NULL"];

const DEFAULT_DEPTH_VALUE: &str = "0.0";

/// Whether a mnemonic belongs to the canonical header schema.
pub fn is_canonical_field(mnemonic: &str) -> bool {
    MANDATORY_FIELDS.contains(&mnemonic)
        || REQUIRED_FIELDS.iter().any(|(m, _)| *m == mnemonic)
}

#[derive(Debug, Clone)]
pub struct HeaderSynthesizer {
    default_null: String,
}

impl Default for HeaderSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_NULL_VALUE)
    }
}

impl HeaderSynthesizer {
    /// `default_null` is assigned as `NULL` when the source declares none.
    pub fn new(default_null: f64) -> Self {
        Self {
            default_null: default_null.to_string(),
        }
    }

    /// Canonicalise `doc` in place against the joined well and log-run records.
    pub fn synthesize(
        &self,
        doc: &mut LasDocument,
        well: &impl MetadataSource,
        log_run: &impl MetadataSource,
    ) {
        let before = doc.well.len();
        doc.well = self.canonical_well_section(&doc.well, well, log_run);
        debug!(
            dropped = before.saturating_sub(doc.well.len()),
            kept = doc.well.len(),
            "Header synthesized"
        );
        normalise_curves(doc);
    }

    fn canonical_well_section(
        &self,
        source: &HeaderSection,
        well: &impl MetadataSource,
        log_run: &impl MetadataSource,
    ) -> HeaderSection {
        let mut section = HeaderSection::new();

        for mnemonic in MANDATORY_FIELDS {
            let item = match source.get(mnemonic) {
                Some(existing) if !existing.value.trim().is_empty() => existing.clone(),
                _ => {
                    let default = if mnemonic == "NULL" {
                        self.default_null.as_str()
                    } else {
                        DEFAULT_DEPTH_VALUE
                    };
                    HeaderItem::new(mnemonic, default)
                }
            };
            section.insert(item);
        }

        for (mnemonic, column) in REQUIRED_FIELDS {
            let value = well.lookup(column).or_else(|| log_run.lookup(column));
            if let Some(value) = value {
                section.insert(HeaderItem::new(mnemonic, value).with_descr(column.column_name()));
            }
        }

        section
    }
}

/// Split folded mnemonic/unit tokens on every curve, then make mnemonics unique.
fn normalise_curves(doc: &mut LasDocument) {
    for curve in std::iter::once(&mut doc.index).chain(doc.curves.iter_mut()) {
        let split = split_mnemonic(&curve.mnemonic);
        curve.mnemonic = split.mnemonic;
        if let Some(unit) = split.unit {
            curve.unit = unit;
        }
    }

    let mut names: Vec<String> = std::iter::once(&doc.index)
        .chain(doc.curves.iter())
        .map(|c| c.mnemonic.clone())
        .collect();
    dedupe_mnemonics(&mut names);
    for (curve, name) in std::iter::once(&mut doc.index)
        .chain(doc.curves.iter_mut())
        .zip(names)
    {
        curve.mnemonic = name;
    }
}
