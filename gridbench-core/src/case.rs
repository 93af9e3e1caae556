//! Benchmark Cases
//!
//! A case is one cell of the job matrix: a definition, one of its operations,
//! one parameter combination and one job. Cases are the unit of execution,
//! isolation and reporting.

use crate::definition::BenchmarkDefinition;
use crate::job::JobDescriptor;
use crate::params::ParameterCombination;
use crate::workload::Workload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle position of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CasePhase {
    /// Built, not yet started
    Created,
    /// Running the setup callable
    SettingUp,
    /// Running unmeasured invocations
    WarmingUp,
    /// Collecting samples
    Measuring,
    /// Running the cleanup callable
    CleaningUp,
    /// Finished with samples
    Completed,
    /// Finished without a usable measurement
    Failed,
}

impl fmt::Display for CasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CasePhase::Created => "created",
            CasePhase::SettingUp => "setting-up",
            CasePhase::WarmingUp => "warming-up",
            CasePhase::Measuring => "measuring",
            CasePhase::CleaningUp => "cleaning-up",
            CasePhase::Completed => "completed",
            CasePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a case failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReason {
    /// The setup callable failed or panicked
    Setup,
    /// An invocation failed or panicked during warmup or measurement
    Iteration,
    /// The case exceeded its time limit
    Timeout,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Setup => f.write_str("setup"),
            FailureReason::Iteration => f.write_str("iteration"),
            FailureReason::Timeout => f.write_str("timeout"),
        }
    }
}

/// Terminal state of a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseOutcome {
    /// Measurement finished
    Completed,
    /// The case failed; any partial samples are still reported
    Failed {
        /// Failure category
        reason: FailureReason,
        /// Human-readable cause
        message: String,
    },
}

impl CaseOutcome {
    /// Failed outcome
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        CaseOutcome::Failed {
            reason,
            message: message.into(),
        }
    }

    /// Whether measurement finished
    pub fn is_completed(&self) -> bool {
        matches!(self, CaseOutcome::Completed)
    }

    /// Failure category, if any
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            CaseOutcome::Completed => None,
            CaseOutcome::Failed { reason, .. } => Some(*reason),
        }
    }

    /// Phase a case ends in with this outcome
    pub fn terminal_phase(&self) -> CasePhase {
        match self {
            CaseOutcome::Completed => CasePhase::Completed,
            CaseOutcome::Failed { .. } => CasePhase::Failed,
        }
    }
}

/// Stable identity of a case, carried into its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseId {
    /// Definition name
    pub benchmark: String,
    /// Operation name
    pub operation: String,
    /// Bound parameter values
    pub parameters: ParameterCombination,
    /// Job the case runs under
    pub job: JobDescriptor,
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.benchmark, self.operation)?;
        if !self.parameters.is_empty() {
            write!(f, "({})", self.parameters)?;
        }
        write!(f, " [{}]", self.job)
    }
}

/// One executable cell of the job matrix
#[derive(Clone)]
pub struct BenchmarkCase {
    definition: Arc<BenchmarkDefinition>,
    operation: usize,
    parameters: ParameterCombination,
    job: JobDescriptor,
}

impl BenchmarkCase {
    pub(crate) fn new(
        definition: Arc<BenchmarkDefinition>,
        operation: usize,
        parameters: ParameterCombination,
        job: JobDescriptor,
    ) -> Self {
        Self {
            definition,
            operation,
            parameters,
            job,
        }
    }

    /// Definition the case belongs to
    pub fn definition(&self) -> &Arc<BenchmarkDefinition> {
        &self.definition
    }

    /// Measured operation name
    pub fn operation(&self) -> &str {
        &self.definition.operations()[self.operation]
    }

    /// Bound parameter values
    pub fn parameters(&self) -> &ParameterCombination {
        &self.parameters
    }

    /// Job the case runs under
    pub fn job(&self) -> &JobDescriptor {
        &self.job
    }

    /// Identity for logs and results
    pub fn id(&self) -> CaseId {
        CaseId {
            benchmark: self.definition.name().to_string(),
            operation: self.operation().to_string(),
            parameters: self.parameters.clone(),
            job: self.job.clone(),
        }
    }

    /// Fresh workload with newly constructed state
    pub fn instantiate(&self) -> Option<Box<dyn Workload>> {
        self.definition.instantiate(self.operation, &self.parameters)
    }
}

impl fmt::Debug for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BenchmarkCase").field(&self.id()).finish()
    }
}

impl fmt::Display for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_renders_parameters_and_job() {
        let id = CaseId {
            benchmark: "QueueBenchmark".to_string(),
            operation: "Enqueue".to_string(),
            parameters: ParameterCombination::from_pairs([("N", 10)]),
            job: JobDescriptor::throughput("core-x64"),
        };
        assert_eq!(id.to_string(), "QueueBenchmark.Enqueue(N=10) [core-x64/throughput]");
    }

    #[test]
    fn id_omits_empty_parameters() {
        let id = CaseId {
            benchmark: "Drain".to_string(),
            operation: "Run".to_string(),
            parameters: ParameterCombination::default(),
            job: JobDescriptor::default(),
        };
        assert_eq!(id.to_string(), "Drain.Run [default/throughput]");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = CaseOutcome::failed(FailureReason::Setup, "boom");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "setup");
        assert_eq!(outcome.failure_reason(), Some(FailureReason::Setup));
        assert_eq!(outcome.terminal_phase(), CasePhase::Failed);
        assert!(CaseOutcome::Completed.is_completed());
    }

    #[test]
    fn reasons_display_lowercase() {
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
        assert_eq!(CasePhase::CleaningUp.to_string(), "cleaning-up");
    }
}
