//! Job descriptors
//!
//! A job pairs a run strategy with an opaque target tag. The tag names the
//! runtime or platform a case is attributed to; the engine only groups and
//! reports by it and never acts on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a case is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStrategy {
    /// Repeated, batched sampling for fast operations
    #[default]
    Throughput,
    /// One warmup and one measured invocation for slow or side-effecting operations
    Monitoring,
}

impl fmt::Display for RunStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStrategy::Throughput => f.write_str("throughput"),
            RunStrategy::Monitoring => f.write_str("monitoring"),
        }
    }
}

impl std::str::FromStr for RunStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "throughput" => Ok(RunStrategy::Throughput),
            "monitoring" => Ok(RunStrategy::Monitoring),
            other => Err(format!("Unknown run strategy: {}", other)),
        }
    }
}

/// Target tag used when no job is configured anywhere
pub const DEFAULT_TARGET: &str = "default";

/// A run strategy bound to a descriptive target tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Descriptive target label, e.g. a runtime/platform identifier
    pub target: String,
    /// Strategy used to measure cases under this job
    #[serde(default)]
    pub strategy: RunStrategy,
}

impl JobDescriptor {
    /// Job with an explicit strategy
    pub fn new(target: impl Into<String>, strategy: RunStrategy) -> Self {
        Self {
            target: target.into(),
            strategy,
        }
    }

    /// Throughput job for `target`
    pub fn throughput(target: impl Into<String>) -> Self {
        Self::new(target, RunStrategy::Throughput)
    }

    /// Monitoring job for `target`
    pub fn monitoring(target: impl Into<String>) -> Self {
        Self::new(target, RunStrategy::Monitoring)
    }
}

impl Default for JobDescriptor {
    fn default() -> Self {
        Self::throughput(DEFAULT_TARGET)
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target, self.strategy)
    }
}

/// Named job presets
///
/// The two presets run the same three runtime tags, once with statistical
/// sampling and once single-shot, so a suite can pick per definition.
pub struct JobSet;

impl JobSet {
    /// Runtime tags shared by both presets
    pub const TARGETS: [&'static str; 3] = ["net47-ryujit-x64", "mono-x64", "core-x64"];

    /// Every target under the throughput strategy
    pub fn main() -> Vec<JobDescriptor> {
        Self::TARGETS
            .iter()
            .map(|t| JobDescriptor::throughput(*t))
            .collect()
    }

    /// Every target under the monitoring strategy
    pub fn monitoring() -> Vec<JobDescriptor> {
        Self::TARGETS
            .iter()
            .map(|t| JobDescriptor::monitoring(*t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_round_trips_through_str() {
        for strategy in [RunStrategy::Throughput, RunStrategy::Monitoring] {
            assert_eq!(strategy.to_string().parse::<RunStrategy>(), Ok(strategy));
        }
        assert!("statistical".parse::<RunStrategy>().is_err());
    }

    #[test]
    fn presets_share_targets() {
        let main = JobSet::main();
        let monitoring = JobSet::monitoring();
        assert_eq!(main.len(), 3);
        assert!(main.iter().all(|j| j.strategy == RunStrategy::Throughput));
        assert!(monitoring.iter().all(|j| j.strategy == RunStrategy::Monitoring));
        assert!(main.iter().zip(&monitoring).all(|(a, b)| a.target == b.target));
    }

    #[test]
    fn display_is_target_slash_strategy() {
        assert_eq!(JobDescriptor::monitoring("core").to_string(), "core/monitoring");
    }

    #[test]
    fn strategy_defaults_when_omitted() {
        let job: JobDescriptor = serde_json::from_str(r#"{"target":"mono"}"#).unwrap();
        assert_eq!(job, JobDescriptor::throughput("mono"));
    }
}
