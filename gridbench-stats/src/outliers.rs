//! Outlier Counting
//!
//! Tukey fences on the interquartile range. Outliers are counted and reported,
//! never removed: every reported statistic is computed from the full sample set.

use crate::percentiles::percentile_of_sorted;
use serde::{Deserialize, Serialize};

/// Default fence multiplier (the classic 1.5 × IQR)
pub const DEFAULT_FENCE: f64 = 1.5;

/// Number of samples outside the Tukey fences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutlierCounts {
    /// Samples below `Q1 - k * IQR`
    pub low: usize,
    /// Samples above `Q3 + k * IQR`
    pub high: usize,
}

impl OutlierCounts {
    /// Total outliers on both sides
    pub fn total(&self) -> usize {
        self.low + self.high
    }
}

/// Count outliers in an ascending slice using fence multiplier `k`.
///
/// Fewer than four samples cannot give meaningful quartiles, so they never
/// produce outliers.
pub fn count_outliers(sorted: &[f64], k: f64) -> OutlierCounts {
    if sorted.len() < 4 {
        return OutlierCounts::default();
    }

    let q1 = percentile_of_sorted(sorted, 25.0);
    let q3 = percentile_of_sorted(sorted, 75.0);
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - k * iqr, q3 + k * iqr);

    // The slice is sorted, so both tails are contiguous runs.
    let low = sorted.partition_point(|&x| x < lower);
    let high = sorted.len() - sorted.partition_point(|&x| x <= upper);

    OutlierCounts { low, high }
}
