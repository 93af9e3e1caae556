//! Percentile Computation
//!
//! Percentiles are read from the full sample set; nothing is trimmed first, so
//! the upper percentiles keep the tail signal.

use serde::{Deserialize, Serialize};

/// Percentiles reported for every case
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl Percentiles {
    /// Compute the reported percentiles from an already sorted slice.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p50: percentile_of_sorted(sorted, 50.0),
            p90: percentile_of_sorted(sorted, 90.0),
            p95: percentile_of_sorted(sorted, 95.0),
            p99: percentile_of_sorted(sorted, 99.0),
        }
    }
}

/// Sort a copy of `samples` in ascending order.
///
/// NaN compares equal to everything, which keeps the sort total without
/// panicking; timing samples never produce NaN in practice.
pub fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Percentile of an ascending slice, linearly interpolated between the two
/// nearest ranks.
///
/// Returns 0.0 for an empty slice and the only element for a single-element
/// slice.
pub fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let last = sorted.len() - 1;
            let rank = (percentile.clamp(0.0, 100.0) / 100.0) * last as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(last);
            let weight = rank - lower as f64;
            sorted[lower] + weight * (sorted[upper] - sorted[lower])
        }
    }
}

/// Percentile of unsorted samples.
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    percentile_of_sorted(&sorted_copy(samples), percentile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_count() {
        let p50 = compute_percentile(&[5.0, 1.0, 3.0, 2.0, 4.0], 50.0);
        assert!((p50 - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interpolates_between_ranks() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        let p95 = percentile_of_sorted(&sorted, 95.0);
        assert!((p95 - 95.05).abs() < 1e-9);
    }

    #[test]
    fn single_sample_collapses() {
        let p = Percentiles::from_sorted(&[42.0]);
        assert_eq!(p.p50, 42.0);
        assert_eq!(p.p95, 42.0);
        assert_eq!(p.p99, 42.0);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(percentile_of_sorted(&[], 50.0), 0.0);
        assert_eq!(Percentiles::from_sorted(&[]), Percentiles::default());
    }

    #[test]
    fn out_of_range_percentile_is_clamped() {
        let sorted = [1.0, 2.0, 3.0];
        assert_eq!(percentile_of_sorted(&sorted, 150.0), 3.0);
        assert_eq!(percentile_of_sorted(&sorted, -5.0), 1.0);
    }
}
