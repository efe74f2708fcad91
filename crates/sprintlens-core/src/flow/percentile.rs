//! Percentiles over small throughput samples.

use serde::{Deserialize, Serialize};

/// How to pick a percentile from a sorted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileMethod {
    /// Linear interpolation between closest ranks:
    /// rank = p/100 * (n - 1), interpolated between floor and ceil.
    #[default]
    Linear,
    /// Nearest rank: the smallest value with at least p% of the sample at or
    /// below it, rank = ceil(p/100 * n).
    NearestRank,
}

/// Percentile `p` (0..=100) of `values`. Non-finite values are ignored;
/// `None` when nothing usable remains.
pub fn percentile(values: &[f64], p: f64, method: PercentileMethod) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let p = if p.is_finite() { p.clamp(0.0, 100.0) } else { 50.0 };
    let n = sorted.len();

    let value = match method {
        PercentileMethod::Linear => {
            let rank = p / 100.0 * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
        PercentileMethod::NearestRank => {
            let rank = (p / 100.0 * n as f64).ceil() as usize;
            sorted[rank.clamp(1, n) - 1]
        }
    };
    Some(value)
}
