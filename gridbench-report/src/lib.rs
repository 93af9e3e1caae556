#![warn(missing_docs)]
//! gridbench Report - Results and Sinks
//!
//! Turns finished cases into records and moves them out of the engine:
//! - `BenchmarkResult` (one per case) and `RunSummary`
//! - `ResultSink` with collecting, tracing and channel implementations
//! - Human-readable and JSON rendering

mod format;
mod json;
mod result;
mod sink;

pub use format::{format_bytes, format_duration, format_human_output};
pub use json::{RunReport, SCHEMA_VERSION, generate_json_report};
pub use result::{BenchmarkResult, RunSummary, summarize};
pub use sink::{ChannelSink, CollectingSink, ResultSink, SinkError, TracingSink};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// JSON with full schema
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
