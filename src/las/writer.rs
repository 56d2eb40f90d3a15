//! LAS 2.0 writer
//!
//! Output is always unwrapped. Curve values use a fixed precision, the depth
//! column its own (coarser) precision, and missing samples are written as the
//! document's NULL sentinel. Formatting is deterministic so that writing a
//! re-read document reproduces the same bytes.

use crate::types::{HeaderItem, HeaderSection, LasDocument};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const DEFAULT_CURVE_PRECISION: usize = 4;
const DEFAULT_DEPTH_PRECISION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LasWriter {
    curve_precision: usize,
    depth_precision: usize,
}

impl Default for LasWriter {
    fn default() -> Self {
        Self {
            curve_precision: DEFAULT_CURVE_PRECISION,
            depth_precision: DEFAULT_DEPTH_PRECISION,
        }
    }
}

impl LasWriter {
    pub fn new(curve_precision: usize, depth_precision: usize) -> Self {
        Self {
            curve_precision,
            depth_precision,
        }
    }

    /// Render a document to LAS text.
    pub fn render(&self, doc: &LasDocument) -> String {
        let mut out = String::new();

        let mut version = doc.version.clone();
        if !version.contains("VERS") {
            version.insert(
                HeaderItem::new("VERS", "2.0").with_descr("CWLS LOG ASCII STANDARD - VERSION 2.0"),
            );
        }
        version.insert(HeaderItem::new("WRAP", "NO").with_descr("ONE LINE PER DEPTH STEP"));

        write_section(&mut out, "~Version Information", &version);
        write_section(&mut out, "~Well Information", &doc.well);

        let curve_defs: HeaderSection = std::iter::once(&doc.index)
            .chain(doc.curves.iter())
            .map(|c| {
                HeaderItem::new(c.mnemonic.clone(), "")
                    .with_unit(c.unit.clone())
                    .with_descr(c.descr.clone())
            })
            .collect();
        write_section(&mut out, "~Curve Information", &curve_defs);
        write_section(&mut out, "~Parameter Information", &doc.parameters);

        out.push_str("~Other\n");
        for line in doc.other.lines() {
            out.push_str(line);
            out.push('\n');
        }

        self.write_data(&mut out, doc);
        out
    }

    /// Write to `path` through a temporary sibling file and a rename, so a
    /// reader never observes a partially written document.
    pub fn write_atomic(&self, doc: &LasDocument, path: &Path) -> io::Result<()> {
        let tmp = path.with_extension("las.tmp");
        fs::write(&tmp, self.render(doc))?;
        fs::rename(&tmp, path)
    }

    fn write_data(&self, out: &mut String, doc: &LasDocument) {
        let null_value = doc.null_value();
        let depth_width = column_width(self.depth_precision);
        let value_width = column_width(self.curve_precision);

        out.push_str("~ASCII");
        let _ = write!(out, " {:>w$}", doc.index.mnemonic, w = depth_width);
        for curve in &doc.curves {
            let _ = write!(out, " {:>w$}", curve.mnemonic, w = value_width);
        }
        out.push('\n');

        for (row, depth) in doc.depths().iter().enumerate() {
            let _ = write!(
                out,
                "      {:>w$.p$}",
                depth,
                w = depth_width,
                p = self.depth_precision
            );
            for curve in &doc.curves {
                let value = curve.values.get(row).copied().unwrap_or(f64::NAN);
                let value = if value.is_nan() { null_value } else { value };
                let _ = write!(
                    out,
                    " {:>w$.p$}",
                    value,
                    w = value_width,
                    p = self.curve_precision
                );
            }
            out.push('\n');
        }
    }
}

fn column_width(precision: usize) -> usize {
    precision + 8
}

fn write_section(out: &mut String, title: &str, section: &HeaderSection) {
    out.push_str(title);
    out.push('\n');

    let name_width = section
        .iter()
        .map(|item| item.mnemonic.len() + 1 + item.unit.len())
        .max()
        .unwrap_or(0);
    let value_width = section.iter().map(|item| item.value.len()).max().unwrap_or(0);

    for item in section.iter() {
        let name = format!("{}.{}", item.mnemonic, item.unit);
        let line = format!(
            " {:<nw$} {:<vw$} : {}",
            name,
            item.value,
            item.descr,
            nw = name_width,
            vw = value_width
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
}
