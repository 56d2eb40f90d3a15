//! Piecewise-linear resampling onto a new depth index

/// Resample `(depths, values)` onto `targets`.
///
/// `depths` must be strictly increasing. Targets outside
/// `[depths[0], depths[last]]` get `NaN`; nothing is extrapolated. A target
/// that falls on a source depth takes that sample exactly. Between samples the
/// value is interpolated linearly, so a missing (`NaN`) neighbour yields `NaN`.
pub fn resample(depths: &[f64], values: &[f64], targets: &[f64]) -> Vec<f64> {
    let n = depths.len().min(values.len());
    if n == 0 {
        return vec![f64::NAN; targets.len()];
    }
    let depths = &depths[..n];
    let values = &values[..n];
    let (lo, hi) = (depths[0], depths[n - 1]);

    targets
        .iter()
        .map(|&t| {
            if !(lo..=hi).contains(&t) {
                return f64::NAN;
            }
            let upper = depths.partition_point(|&d| d <= t);
            // t >= lo guarantees upper >= 1
            let i = upper - 1;
            if depths[i] == t || upper == n {
                return values[i];
            }
            let (d0, d1) = (depths[i], depths[upper]);
            let (v0, v1) = (values[i], values[upper]);
            v0 + (v1 - v0) * (t - d0) / (d1 - d0)
        })
        .collect()
}
