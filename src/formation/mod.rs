//! Formation intervals
//!
//! [`FormationIntervalBuilder`] turns sparse, unsorted formation-top rows into
//! a sorted, non-overlapping interval list. [`FormationTable`] serialises that
//! list into the text block embedded in the `~Other` section and answers
//! depth-to-formation lookups.

use crate::types::{FormationInterval, FormationTopRecord, UNKNOWN_FORMATION};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

/// Header line of the embedded formation table.
pub const TABLE_HEADER: [&str; 3] = ["TOP", "BASE", "FORMATION"];

const TABLE_DEPTH_PRECISION: usize = 2;

// ============================================================================
// Builder
// ============================================================================

pub struct FormationIntervalBuilder;

impl FormationIntervalBuilder {
    /// Build intervals for one well spanning `[start, stop]`.
    ///
    /// 1. Rows with an explicit base above their top are flipped.
    /// 2. Rows are sorted by top.
    /// 3. A missing base is inferred from the next row's top, or `stop` for
    ///    the last row; an inferred base never lies above its own top.
    /// 4. Depths above the first top down from `start` become `Unknown`.
    /// 5. Overlaps are resolved by truncating the earlier interval at the
    ///    later one's start.
    ///
    /// An explicit base on the last row is kept as given, even when it ends
    /// above `stop`. Zero-thickness intervals are dropped.
    pub fn build(rows: &[FormationTopRecord], start: f64, stop: f64) -> Vec<FormationInterval> {
        let mut rows: Vec<(f64, Option<f64>, &str)> = rows
            .iter()
            .filter(|r| r.top.is_finite())
            .map(|r| match r.base {
                Some(base) if base < r.top => (base, Some(r.top), r.formation.as_str()),
                base => (r.top, base.filter(|b| b.is_finite()), r.formation.as_str()),
            })
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut intervals: Vec<FormationInterval> = Vec::with_capacity(rows.len() + 1);
        for (i, &(top, base, name)) in rows.iter().enumerate() {
            let end = match base {
                Some(base) => base,
                None => {
                    let inferred = rows.get(i + 1).map_or(stop, |next| next.0);
                    inferred.max(top)
                }
            };
            intervals.push(FormationInterval::new(top, end, name));
        }

        if let Some(first) = intervals.first() {
            if first.start > start {
                let unknown = FormationInterval::new(start, first.start, UNKNOWN_FORMATION);
                intervals.insert(0, unknown);
            }
        }

        for i in 0..intervals.len().saturating_sub(1) {
            let next_start = intervals[i + 1].start;
            if intervals[i].end > next_start {
                debug!(
                    formation = %intervals[i].name,
                    end = intervals[i].end,
                    truncated_to = next_start,
                    "Truncating overlapping formation interval"
                );
                intervals[i].end = next_start;
            }
        }

        intervals.retain(|iv| iv.end > iv.start);
        intervals
    }
}

// ============================================================================
// Embedded table
// ============================================================================

#[derive(Debug, Error)]
pub enum FormationTableError {
    #[error("formation table: {0}")]
    Csv(#[from] csv::Error),

    #[error("formation table row {row}: '{value}' is not a depth")]
    BadDepth { row: usize, value: String },
}

/// Sorted, non-overlapping intervals of one well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormationTable {
    intervals: Vec<FormationInterval>,
}

impl FormationTable {
    pub fn new(intervals: Vec<FormationInterval>) -> Self {
        Self { intervals }
    }

    pub fn intervals(&self) -> &[FormationInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Formation whose half-open interval contains `depth`, else `Unknown`.
    pub fn formation_at(&self, depth: f64) -> &str {
        let idx = self.intervals.partition_point(|iv| iv.start <= depth);
        match idx.checked_sub(1).map(|i| &self.intervals[i]) {
            Some(iv) if iv.contains(depth) => &iv.name,
            _ => UNKNOWN_FORMATION,
        }
    }

    pub fn label_depths(&self, depths: &[f64]) -> Vec<&str> {
        depths.iter().map(|&d| self.formation_at(d)).collect()
    }

    /// Samples per formation, in first-seen depth order.
    pub fn sample_counts(&self, depths: &[f64]) -> IndexMap<String, usize> {
        let mut counts = IndexMap::new();
        for label in self.label_depths(depths) {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Serialise as the `TOP,BASE,FORMATION` text block.
    pub fn to_text(&self) -> Result<String, FormationTableError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(TABLE_HEADER)?;
        for iv in &self.intervals {
            writer.write_record([
                format!("{:.p$}", iv.start, p = TABLE_DEPTH_PRECISION),
                format!("{:.p$}", iv.end, p = TABLE_DEPTH_PRECISION),
                iv.name.clone(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| FormationTableError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
    }

    /// Parse a table back out of `~Other` text. The header columns may come
    /// in any order and any case. Text without a table header yields an
    /// empty table.
    pub fn parse(text: &str) -> Result<Self, FormationTableError> {
        let Some((offset, [top_col, base_col, name_col])) = text
            .lines()
            .enumerate()
            .find_map(|(i, line)| header_positions(line).map(|cols| (i, cols)))
        else {
            return Ok(Self::default());
        };
        let block: Vec<&str> = text.lines().skip(offset).map(str::trim).collect();
        let block = block.join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(block.as_bytes());
        let mut intervals = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let depth = |i: usize| -> Result<f64, FormationTableError> {
                let value = record.get(i).unwrap_or_default();
                value.parse::<f64>().map_err(|_| FormationTableError::BadDepth {
                    row: row + 1,
                    value: value.to_string(),
                })
            };
            let name = record.get(name_col).unwrap_or(UNKNOWN_FORMATION);
            intervals.push(FormationInterval::new(depth(top_col)?, depth(base_col)?, name));
        }
        Ok(Self { intervals })
    }
}

/// Positions of `TOP`, `BASE` and `FORMATION` if `line` is a table header.
fn header_positions(line: &str) -> Option<[usize; 3]> {
    let cells: Vec<String> = line.split(',').map(|c| c.trim().to_ascii_uppercase()).collect();
    if cells.len() != TABLE_HEADER.len() {
        return None;
    }
    let mut positions = [0usize; 3];
    for (slot, column) in positions.iter_mut().zip(TABLE_HEADER) {
        *slot = cells.iter().position(|c| c == column)?;
    }
    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WellId;

    fn top(top: f64, base: Option<f64>, name: &str) -> FormationTopRecord {
        FormationTopRecord {
            kid: WellId::new("1"),
            top,
            base,
            formation: name.to_string(),
        }
    }

    fn spans(intervals: &[FormationInterval]) -> Vec<(&str, f64, f64)> {
        intervals
            .iter()
            .map(|iv| (iv.name.as_str(), iv.start, iv.end))
            .collect()
    }

    #[test]
    fn test_explicit_last_base_not_extended() {
        let rows = vec![top(1000.0, None, "A"), top(1200.0, Some(1250.0), "B")];
        let intervals = FormationIntervalBuilder::build(&rows, 900.0, 1400.0);
        assert_eq!(
            spans(&intervals),
            vec![
                ("Unknown", 900.0, 1000.0),
                ("A", 1000.0, 1200.0),
                ("B", 1200.0, 1250.0)
            ]
        );
    }

    #[test]
    fn test_unsorted_rows_and_last_base_inferred_from_stop() {
        let rows = vec![top(1300.0, None, "C"), top(1000.0, None, "A")];
        let intervals = FormationIntervalBuilder::build(&rows, 1000.0, 1400.0);
        assert_eq!(
            spans(&intervals),
            vec![("A", 1000.0, 1300.0), ("C", 1300.0, 1400.0)]
        );
    }

    #[test]
    fn test_overlap_truncated_later_wins() {
        let rows = vec![top(1000.0, Some(1300.0), "A"), top(1200.0, Some(1400.0), "B")];
        let intervals = FormationIntervalBuilder::build(&rows, 1000.0, 1400.0);
        assert_eq!(
            spans(&intervals),
            vec![("A", 1000.0, 1200.0), ("B", 1200.0, 1400.0)]
        );
        for pair in intervals.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_inverted_row_is_flipped() {
        let rows = vec![top(1250.0, Some(1200.0), "B")];
        let intervals = FormationIntervalBuilder::build(&rows, 1200.0, 1400.0);
        assert_eq!(spans(&intervals), vec![("B", 1200.0, 1250.0)]);
    }

    #[test]
    fn test_inferred_base_clamped_to_top() {
        // STOP above the last top must not produce a negative interval
        let rows = vec![top(1000.0, None, "A"), top(1500.0, None, "Deep")];
        let intervals = FormationIntervalBuilder::build(&rows, 1000.0, 1400.0);
        assert_eq!(spans(&intervals), vec![("A", 1000.0, 1500.0)]);
    }

    #[test]
    fn test_no_rows_no_intervals() {
        assert!(FormationIntervalBuilder::build(&[], 0.0, 100.0).is_empty());
    }

    #[test]
    fn test_labelling_is_half_open() {
        let table = FormationTable::new(vec![
            FormationInterval::new(1000.0, 1200.0, "A"),
            FormationInterval::new(1200.0, 1250.0, "B"),
        ]);
        assert_eq!(table.formation_at(999.9), "Unknown");
        assert_eq!(table.formation_at(1000.0), "A");
        assert_eq!(table.formation_at(1200.0), "B");
        assert_eq!(table.formation_at(1250.0), "Unknown");
        assert_eq!(
            table.label_depths(&[1100.0, 1249.0, 1300.0]),
            vec!["A", "B", "Unknown"]
        );
    }

    #[test]
    fn test_labelling_gap_between_intervals() {
        let table = FormationTable::new(vec![
            FormationInterval::new(1000.0, 1100.0, "A"),
            FormationInterval::new(1200.0, 1300.0, "B"),
        ]);
        assert_eq!(table.formation_at(1150.0), "Unknown");
        let counts = table.sample_counts(&[1000.0, 1050.0, 1150.0, 1250.0]);
        assert_eq!(counts.get("A"), Some(&2));
        assert_eq!(counts.get("Unknown"), Some(&1));
        assert_eq!(counts.get("B"), Some(&1));
    }

    #[test]
    fn test_table_text_round_trip() {
        let table = FormationTable::new(vec![
            FormationInterval::new(900.0, 1000.0, "Unknown"),
            FormationInterval::new(1000.0, 1200.5, "Lansing, Upper"),
        ]);
        let text = table.to_text().unwrap();
        assert!(text.starts_with("TOP,BASE,FORMATION\n900.00,1000.00,Unknown\n"));
        let parsed = FormationTable::parse(&format!("some preamble\n{}\n", text)).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_parse_without_header_is_empty() {
        assert!(FormationTable::parse("free text only").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_depth() {
        let err = FormationTable::parse("TOP,BASE,FORMATION\nabc,10,A\n").unwrap_err();
        assert!(matches!(err, FormationTableError::BadDepth { row: 1, .. }));
    }

    #[test]
    fn test_parse_header_in_any_order() {
        let text = "Formation tops\nformation, Base ,TOP\nLansing,1010.5,1000\nArbuckle,1100,1010.5\n";
        let table = FormationTable::parse(text).unwrap();
        assert_eq!(
            spans(table.intervals()),
            vec![("Lansing", 1000.0, 1010.5), ("Arbuckle", 1010.5, 1100.0)]
        );
    }

    #[test]
    fn test_header_needs_exactly_the_three_columns() {
        assert!(FormationTable::parse("TOP,BASE\n1,2\n").unwrap().is_empty());
        assert!(FormationTable::parse("TOP,BASE,FORMATION,KID\n1,2,A,9\n").unwrap().is_empty());
        assert!(FormationTable::parse("TOP,TOP,FORMATION\n1,2,A\n").unwrap().is_empty());
    }
}
