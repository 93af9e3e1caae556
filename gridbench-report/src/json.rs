//! JSON Output

use crate::result::{BenchmarkResult, RunSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every JSON report
pub const SCHEMA_VERSION: u32 = 1;

/// Everything a run produced, in serializable form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Report schema version
    pub schema_version: u32,
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
    /// Per-case results in completion order
    pub results: Vec<BenchmarkResult>,
    /// Run-level counts
    pub summary: RunSummary,
}

impl RunReport {
    /// Assemble a report stamped with the current time
    pub fn new(results: Vec<BenchmarkResult>, summary: RunSummary) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            results,
            summary,
        }
    }
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
