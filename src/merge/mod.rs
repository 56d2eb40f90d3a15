//! Merge-on-collision
//!
//! When several source documents resolve to the same output well, the first
//! becomes the merge target and every later one can only add curves the
//! target lacks. Added curves are resampled onto the target's depth index.

mod interpolate;

pub use interpolate::resample;

use crate::types::{Curve, LasDocument};
use tracing::debug;

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Mnemonics appended to the target
    pub added: Vec<String>,
    /// Source mnemonics already present in the target
    pub already_present: Vec<String>,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }
}

pub struct CurveMergeEngine;

impl CurveMergeEngine {
    /// Merge `source` into `target` and return the result.
    pub fn merge(mut target: LasDocument, source: &LasDocument) -> LasDocument {
        Self::merge_into(&mut target, source);
        target
    }

    /// Append every curve of `source` that `target` lacks, resampled onto
    /// `target`'s depth index. Curves already in `target` are never touched,
    /// and the source depth column itself is not merged.
    pub fn merge_into(target: &mut LasDocument, source: &LasDocument) -> MergeReport {
        let mut report = MergeReport::default();
        let target_depths = target.index.values.clone();

        for curve in &source.curves {
            if target.has_curve(&curve.mnemonic) {
                report.already_present.push(curve.mnemonic.clone());
                continue;
            }
            let values = resample(source.depths(), &curve.values, &target_depths);
            target.curves.push(
                Curve::new(curve.mnemonic.clone(), curve.unit.clone(), values)
                    .with_descr(curve.descr.clone()),
            );
            report.added.push(curve.mnemonic.clone());
        }

        debug!(
            added = report.added.len(),
            already_present = report.already_present.len(),
            "Curves merged"
        );
        report
    }
}
