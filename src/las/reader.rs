//! LAS 2.0 reader
//!
//! Header lines follow `MNEM.UNIT VALUE : DESCRIPTION`, where the unit runs from
//! the first `.` to the next whitespace and the description starts after the
//! last `:`. Data may be wrapped or unwrapped; values are read as a flat token
//! stream and chunked by the number of curve definitions.

use super::LasError;
use crate::types::{Curve, HeaderItem, HeaderSection, LasDocument};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Version,
    Well,
    Curve,
    Parameter,
    Other,
    Ascii,
    Unknown,
}

impl Section {
    fn from_marker(line: &str) -> Self {
        match line[1..].chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('V') => Self::Version,
            Some('W') => Self::Well,
            Some('C') => Self::Curve,
            Some('P') => Self::Parameter,
            Some('O') => Self::Other,
            Some('A') => Self::Ascii,
            _ => Self::Unknown,
        }
    }
}

/// Read and parse a LAS file. Bytes that are not valid UTF-8 are replaced,
/// since legacy logs are frequently Latin-1.
pub fn read_path(path: &Path) -> Result<LasDocument, LasError> {
    let bytes = fs::read(path).map_err(|source| LasError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&String::from_utf8_lossy(&bytes))
}

/// Parse LAS text into a document.
///
/// The NULL sentinel becomes `NaN`. A descending depth index is reversed,
/// consecutive duplicate depths are dropped (first row wins) and any other
/// non-monotonic index is rejected. A document with curve definitions but no
/// data rows is returned as-is; callers decide whether that is an error.
pub fn parse_str(text: &str) -> Result<LasDocument, LasError> {
    let mut section = Section::Preamble;
    let mut version = HeaderSection::new();
    let mut well = HeaderSection::new();
    let mut parameters = HeaderSection::new();
    let mut curve_defs: Vec<HeaderItem> = Vec::new();
    let mut other_lines: Vec<&str> = Vec::new();
    let mut data: Vec<f64> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();

        if trimmed.starts_with('~') {
            section = Section::from_marker(trimmed);
            if section == Section::Unknown {
                debug!(line = line_no, marker = trimmed, "Skipping unknown LAS section");
            }
            continue;
        }

        if section == Section::Other {
            other_lines.push(raw.trim_end());
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match section {
            Section::Preamble => {
                return Err(LasError::Syntax {
                    line: line_no,
                    message: "content before the first section marker".to_string(),
                });
            }
            Section::Version => version.insert(parse_header_line(trimmed, line_no)?),
            Section::Well => well.insert(parse_header_line(trimmed, line_no)?),
            Section::Parameter => parameters.insert(parse_header_line(trimmed, line_no)?),
            Section::Curve => curve_defs.push(parse_header_line(trimmed, line_no)?),
            Section::Ascii => {
                for token in trimmed.split_whitespace() {
                    let value = token.parse::<f64>().map_err(|_| LasError::Syntax {
                        line: line_no,
                        message: format!("'{}' is not a number", token),
                    })?;
                    data.push(value);
                }
            }
            Section::Other | Section::Unknown => {}
        }
    }

    if curve_defs.is_empty() {
        return Err(LasError::MissingCurves);
    }

    let columns = curve_defs.len();
    if data.len() % columns != 0 {
        return Err(LasError::RaggedData {
            values: data.len(),
            columns,
        });
    }

    let null_value = LasDocument {
        well: well.clone(),
        ..Default::default()
    }
    .null_value();

    let rows = data.len() / columns;
    let mut curves: Vec<Curve> = curve_defs
        .into_iter()
        .map(|def| {
            Curve::new(def.mnemonic, def.unit, Vec::with_capacity(rows)).with_descr(def.descr)
        })
        .collect();

    for row in data.chunks(columns) {
        for (curve, &value) in curves.iter_mut().zip(row) {
            curve.values.push(if is_null(value, null_value) {
                f64::NAN
            } else {
                value
            });
        }
    }

    let mut curves = curves.into_iter();
    let mut index = curves.next().ok_or(LasError::MissingCurves)?;
    let mut curves: Vec<Curve> = curves.collect();
    normalise_index(&mut index, &mut curves)?;

    Ok(LasDocument {
        version,
        well,
        parameters,
        index,
        curves,
        other: join_other(&other_lines),
    })
}

/// Split one header line into its four parts.
fn parse_header_line(line: &str, line_no: usize) -> Result<HeaderItem, LasError> {
    let (left, descr) = match line.rfind(':') {
        Some(pos) => (&line[..pos], line[pos + 1..].trim()),
        None => (line, ""),
    };

    let (mnemonic, unit, value) = match left.find('.') {
        Some(dot) => {
            let rest = &left[dot + 1..];
            let unit_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (
                left[..dot].trim(),
                &rest[..unit_end],
                rest[unit_end..].trim(),
            )
        }
        None => {
            let left = left.trim();
            match left.split_once(char::is_whitespace) {
                Some((mnemonic, value)) => (mnemonic, "", value.trim()),
                None => (left, "", ""),
            }
        }
    };

    if mnemonic.is_empty() {
        return Err(LasError::Syntax {
            line: line_no,
            message: "header line has no mnemonic".to_string(),
        });
    }

    Ok(HeaderItem::new(mnemonic, value)
        .with_unit(unit)
        .with_descr(descr))
}

fn is_null(value: f64, null_value: f64) -> bool {
    value.is_nan() || (value - null_value).abs() < 1e-9
}

/// Make the index strictly increasing, reordering every curve alongside it.
fn normalise_index(index: &mut Curve, curves: &mut [Curve]) -> Result<(), LasError> {
    let depths = &index.values;
    if depths.len() >= 2 && depths[0] > depths[depths.len() - 1] {
        index.values.reverse();
        for curve in curves.iter_mut() {
            curve.values.reverse();
        }
    }

    let mut keep = Vec::with_capacity(index.values.len());
    let mut previous: Option<f64> = None;
    for (row, &depth) in index.values.iter().enumerate() {
        if depth.is_nan() {
            return Err(LasError::Syntax {
                line: 0,
                message: format!("missing depth value at data row {}", row),
            });
        }
        match previous {
            Some(prev) if depth == prev => keep.push(false),
            Some(prev) if depth < prev => {
                return Err(LasError::NonMonotonicIndex {
                    row,
                    previous: prev,
                    depth,
                });
            }
            _ => {
                keep.push(true);
                previous = Some(depth);
            }
        }
    }

    if keep.iter().all(|&k| k) {
        return Ok(());
    }

    debug!(
        dropped = keep.iter().filter(|&&k| !k).count(),
        "Dropping duplicate depth rows"
    );
    retain_rows(&mut index.values, &keep);
    for curve in curves.iter_mut() {
        retain_rows(&mut curve.values, &keep);
    }
    Ok(())
}

fn retain_rows(values: &mut Vec<f64>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(false));
}

fn join_other(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}
