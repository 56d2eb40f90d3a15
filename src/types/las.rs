//! In-memory LAS document model
//!
//! Missing samples are stored as `f64::NAN`; the document's NULL sentinel is
//! only applied when writing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fallback NULL sentinel when a document does not declare one.
pub const DEFAULT_NULL_VALUE: f64 = -999.25;

/// A single `MNEM.UNIT VALUE : DESCRIPTION` header line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderItem {
    pub mnemonic: String,
    pub unit: String,
    pub value: String,
    pub descr: String,
}

impl HeaderItem {
    pub fn new(mnemonic: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_descr(mut self, descr: impl Into<String>) -> Self {
        self.descr = descr.into();
        self
    }
}

/// Ordered header section keyed by mnemonic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeaderSection {
    items: IndexMap<String, HeaderItem>,
}

impl HeaderSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item. A replaced item keeps its position.
    pub fn insert(&mut self, item: HeaderItem) {
        self.items.insert(item.mnemonic.clone(), item);
    }

    pub fn get(&self, mnemonic: &str) -> Option<&HeaderItem> {
        self.items.get(mnemonic)
    }

    pub fn value(&self, mnemonic: &str) -> Option<&str> {
        self.items
            .get(mnemonic)
            .map(|item| item.value.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.items.contains_key(mnemonic)
    }

    pub fn remove(&mut self, mnemonic: &str) -> Option<HeaderItem> {
        self.items.shift_remove(mnemonic)
    }

    pub fn mnemonics(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<HeaderItem> for HeaderSection {
    fn from_iter<I: IntoIterator<Item = HeaderItem>>(iter: I) -> Self {
        let mut section = Self::new();
        for item in iter {
            section.insert(item);
        }
        section
    }
}

/// A named data curve. `values` is aligned with the owning document's depth index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    pub mnemonic: String,
    pub unit: String,
    pub descr: String,
    pub values: Vec<f64>,
}

impl Curve {
    pub fn new(mnemonic: impl Into<String>, unit: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            unit: unit.into(),
            descr: String::new(),
            values,
        }
    }

    pub fn with_descr(mut self, descr: impl Into<String>) -> Self {
        self.descr = descr.into();
        self
    }
}

/// A parsed or synthesized well-log document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LasDocument {
    pub version: HeaderSection,
    pub well: HeaderSection,
    pub parameters: HeaderSection,
    /// Primary depth column, strictly increasing.
    pub index: Curve,
    pub curves: Vec<Curve>,
    /// Free text of the `~Other` section.
    pub other: String,
}

impl LasDocument {
    pub fn depths(&self) -> &[f64] {
        &self.index.values
    }

    pub fn row_count(&self) -> usize {
        self.index.values.len()
    }

    pub fn curve(&self, mnemonic: &str) -> Option<&Curve> {
        self.curves.iter().find(|c| c.mnemonic == mnemonic)
    }

    pub fn has_curve(&self, mnemonic: &str) -> bool {
        self.index.mnemonic == mnemonic || self.curve(mnemonic).is_some()
    }

    pub fn curve_mnemonics(&self) -> impl Iterator<Item = &str> {
        self.curves.iter().map(|c| c.mnemonic.as_str())
    }

    /// `(depth, value)` pairs of a curve, missing samples included.
    pub fn samples<'a>(&'a self, curve: &'a Curve) -> impl Iterator<Item = (f64, f64)> + 'a {
        self.index
            .values
            .iter()
            .copied()
            .zip(curve.values.iter().copied())
    }

    /// Numeric value of a `~Well` item, if present and parseable.
    pub fn well_f64(&self, mnemonic: &str) -> Option<f64> {
        self.well.value(mnemonic).and_then(|v| v.parse::<f64>().ok())
    }

    /// The declared NULL sentinel, or [`DEFAULT_NULL_VALUE`].
    pub fn null_value(&self) -> f64 {
        self.well_f64("NULL").unwrap_or(DEFAULT_NULL_VALUE)
    }

    /// Depth range actually covered by data rows.
    pub fn depth_range(&self) -> Option<(f64, f64)> {
        Some((*self.index.values.first()?, *self.index.values.last()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_replace_keeps_position() {
        let mut section: HeaderSection = [
            HeaderItem::new("STRT", "100"),
            HeaderItem::new("STOP", "200"),
        ]
        .into_iter()
        .collect();
        section.insert(HeaderItem::new("STRT", "150"));
        let order: Vec<&str> = section.mnemonics().collect();
        assert_eq!(order, vec!["STRT", "STOP"]);
        assert_eq!(section.value("STRT"), Some("150"));
    }

    #[test]
    fn test_blank_value_reads_as_absent() {
        let section: HeaderSection = [HeaderItem::new("NULL", "  ")].into_iter().collect();
        assert!(section.contains("NULL"));
        assert_eq!(section.value("NULL"), None);
    }

    #[test]
    fn test_null_value_defaults() {
        let mut doc = LasDocument::default();
        assert_eq!(doc.null_value(), DEFAULT_NULL_VALUE);
        doc.well.insert(HeaderItem::new("NULL", "-9999"));
        assert_eq!(doc.null_value(), -9999.0);
    }

    #[test]
    fn test_index_counts_as_present_curve() {
        let doc = LasDocument {
            index: Curve::new("DEPT", "F", vec![1.0, 2.0]),
            curves: vec![Curve::new("GR", "API", vec![10.0, 20.0])],
            ..Default::default()
        };
        assert!(doc.has_curve("DEPT"));
        assert!(doc.has_curve("GR"));
        assert!(!doc.has_curve("RHOB"));
        assert_eq!(doc.depth_range(), Some((1.0, 2.0)));
    }
}
