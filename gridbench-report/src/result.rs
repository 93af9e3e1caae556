//! Result Records

use chrono::{DateTime, Utc};
use gridbench_core::{
    CaseId, CaseOutcome, DiagnosticsSummary, FailureReason, IterationSample, durations,
};
use gridbench_stats::{SummaryStatistics, compute_summary};
use serde::{Deserialize, Serialize};

/// Finalized record for one case, emitted exactly once per case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Case identity
    #[serde(flatten)]
    pub id: CaseId,
    /// Category tags of the definition
    pub categories: Vec<String>,
    /// How the case ended
    pub outcome: CaseOutcome,
    /// Summary of the measured samples; `None` when nothing was measured
    pub statistics: Option<SummaryStatistics>,
    /// Raw per-operation samples, in measurement order
    pub samples: Vec<IterationSample>,
    /// Operations per measured sample
    pub ops_per_sample: u64,
    /// Operations executed across all measured samples
    pub total_operations: u64,
    /// Unmeasured invocations before measurement
    pub warmup_invocations: u64,
    /// Warmup ended at its iteration cap
    pub warmup_capped: bool,
    /// The pilot stopped at the maximum batch size
    pub pilot_capped: bool,
    /// Allocation figures, present only for diagnosed cases
    pub diagnostics: Option<DiagnosticsSummary>,
    /// Cleanup failure, recorded without invalidating samples
    pub cleanup_error: Option<String>,
    /// Wall-clock time the case took, in nanoseconds
    pub duration_ns: u64,
    /// When the result was finalized
    pub completed_at: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Number of measured samples
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Whether the case finished its measurement
    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }

    /// Failure category, if the case failed
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.outcome.failure_reason()
    }

    /// Mean time per operation
    pub fn mean_ns(&self) -> Option<f64> {
        self.statistics.as_ref().map(|s| s.mean)
    }

    /// Sample standard deviation; absent below two samples
    pub fn std_dev_ns(&self) -> Option<f64> {
        self.statistics
            .as_ref()
            .filter(|s| s.sample_count >= 2)
            .map(|s| s.std_dev)
    }
}

/// Statistics for `samples`, or `None` if there are none
pub fn summarize(samples: &[IterationSample]) -> Option<SummaryStatistics> {
    if samples.is_empty() {
        None
    } else {
        Some(compute_summary(&durations(samples)))
    }
}

/// Counts for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Cases enumerated
    pub total: usize,
    /// Cases that completed
    pub completed: usize,
    /// Cases failed in setup
    pub setup_failures: usize,
    /// Cases failed during warmup or measurement
    pub iteration_failures: usize,
    /// Cases that hit their timeout
    pub timeouts: usize,
    /// Cases whose cleanup reported an error
    pub cleanup_failures: usize,
    /// Results the sink refused
    pub sink_errors: usize,
    /// Wall-clock time of the run, in nanoseconds
    pub duration_ns: u64,
}

impl RunSummary {
    /// Count one result
    pub fn record(&mut self, result: &BenchmarkResult) {
        self.total += 1;
        match result.failure_reason() {
            None => self.completed += 1,
            Some(FailureReason::Setup) => self.setup_failures += 1,
            Some(FailureReason::Iteration) => self.iteration_failures += 1,
            Some(FailureReason::Timeout) => self.timeouts += 1,
        }
        if result.cleanup_error.is_some() {
            self.cleanup_failures += 1;
        }
    }

    /// Cases that failed for any reason
    pub fn failed(&self) -> usize {
        self.setup_failures + self.iteration_failures + self.timeouts
    }

    /// Summary over a finished list of results
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result);
        }
        summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gridbench_core::{JobDescriptor, ParameterCombination};

    pub(crate) fn result(outcome: CaseOutcome, samples: &[f64]) -> BenchmarkResult {
        let samples: Vec<IterationSample> = samples
            .iter()
            .map(|&ns| IterationSample::from_block(ns as u64, 1))
            .collect();
        BenchmarkResult {
            id: CaseId {
                benchmark: "Queue".to_string(),
                operation: "Enqueue".to_string(),
                parameters: ParameterCombination::from_pairs([("N", 10)]),
                job: JobDescriptor::default(),
            },
            categories: vec!["Queue".to_string()],
            outcome,
            statistics: summarize(&samples),
            total_operations: samples.len() as u64,
            samples,
            ops_per_sample: 1,
            warmup_invocations: 1,
            warmup_capped: false,
            pilot_capped: false,
            diagnostics: None,
            cleanup_error: None,
            duration_ns: 1_000,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn single_sample_has_no_std_dev() {
        let r = result(CaseOutcome::Completed, &[120.0]);
        assert_eq!(r.mean_ns(), Some(120.0));
        assert_eq!(r.std_dev_ns(), None);

        let r = result(CaseOutcome::Completed, &[100.0, 140.0]);
        assert!(r.std_dev_ns().unwrap() > 0.0);
    }

    #[test]
    fn failed_case_without_samples_has_no_statistics() {
        let r = result(CaseOutcome::failed(FailureReason::Setup, "boom"), &[]);
        assert!(r.statistics.is_none());
        assert_eq!(r.sample_count(), 0);
        assert_eq!(r.failure_reason(), Some(FailureReason::Setup));
    }

    #[test]
    fn summary_counts_by_reason() {
        let mut with_cleanup_error = result(CaseOutcome::Completed, &[1.0]);
        with_cleanup_error.cleanup_error = Some("leak".to_string());
        let results = [
            with_cleanup_error,
            result(CaseOutcome::failed(FailureReason::Timeout, "slow"), &[]),
            result(CaseOutcome::failed(FailureReason::Iteration, "bad"), &[1.0]),
        ];

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.iteration_failures, 1);
        assert_eq!(summary.cleanup_failures, 1);
        assert_eq!(summary.failed(), 2);
    }

    #[test]
    fn identity_is_flattened_in_json() {
        let json = serde_json::to_value(result(CaseOutcome::Completed, &[5.0])).unwrap();
        assert_eq!(json["benchmark"], "Queue");
        assert_eq!(json["parameters"][0]["name"], "N");
        assert_eq!(json["outcome"]["status"], "completed");
    }
}
