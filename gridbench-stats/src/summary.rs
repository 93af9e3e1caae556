//! Summary Statistics
//!
//! Reduces a case's per-operation samples (nanoseconds) to the figures carried
//! on a benchmark result. Every statistic here is computed from all samples.

use crate::outliers::{DEFAULT_FENCE, OutlierCounts, count_outliers};
use crate::percentiles::{Percentiles, percentile_of_sorted, sorted_copy};
use serde::{Deserialize, Serialize};

/// Summary of one case's samples
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of samples summarized
    pub sample_count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0.0 below two samples
    pub std_dev: f64,
    /// Population standard deviation (n); 0.0 below two samples
    pub population_std_dev: f64,
    /// Standard error of the mean
    pub std_error: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Median
    pub median: f64,
    /// Reported percentiles
    pub percentiles: Percentiles,
    /// Tukey-fence outliers (counted, not removed)
    pub outliers: OutlierCounts,
}

/// Compute summary statistics for `samples`.
///
/// An empty slice yields all-zero statistics. A single sample yields zero
/// spread and percentiles equal to that sample.
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let sorted = sorted_copy(samples);
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;

    let (std_dev, population_std_dev) = if n < 2 {
        (0.0, 0.0)
    } else {
        let squares = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        (
            (squares / (n - 1) as f64).sqrt(),
            (squares / n as f64).sqrt(),
        )
    };

    SummaryStatistics {
        sample_count: n,
        mean,
        std_dev,
        population_std_dev,
        std_error: std_dev / (n as f64).sqrt(),
        min: sorted[0],
        max: sorted[n - 1],
        median: percentile_of_sorted(&sorted, 50.0),
        percentiles: Percentiles::from_sorted(&sorted),
        outliers: count_outliers(&sorted, DEFAULT_FENCE),
    }
}

/// Relative standard error of the mean (standard error / mean).
///
/// This is the convergence signal for throughput measurement. Fewer than two
/// samples give `f64::INFINITY` (no evidence of convergence yet); a zero mean
/// gives 0.0 since there is nothing left to refine.
pub fn relative_standard_error(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return f64::INFINITY;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (variance.sqrt() / (n as f64).sqrt()) / mean.abs()
}

impl SummaryStatistics {
    /// Coefficient of variation as a percentage
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }

    /// Relative standard error of the mean
    pub fn relative_std_error(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.std_error / self.mean
        }
    }
}
