#![warn(missing_docs)]
//! gridbench Statistics
//!
//! Reduces raw per-operation samples into the figures reported per case:
//! - Mean, sample and population standard deviation, standard error
//! - Min, max, median and p50/p90/p95/p99
//! - Relative standard error, used as the throughput convergence signal
//! - Tukey-fence outlier counts

mod outliers;
mod percentiles;
mod summary;

pub use outliers::{DEFAULT_FENCE, OutlierCounts, count_outliers};
pub use percentiles::{Percentiles, compute_percentile, percentile_of_sorted, sorted_copy};
pub use summary::{SummaryStatistics, compute_summary, relative_standard_error};
