#![warn(missing_docs)]
//! gridbench Runner
//!
//! Executes registered benchmarks: expands the job matrix, runs each case
//! through its lifecycle on a dedicated thread under a timeout, and hands
//! finalized results to a sink.
//!
//! # Example
//!
//! ```ignore
//! use gridbench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.register(queue_benchmark()?)?;
//!
//!     let mut sink = CollectingSink::new();
//!     let summary = gridbench_runner::run(&registry, &mut sink)?;
//!     println!("{}", format_human_output(sink.results(), &summary));
//!     Ok(())
//! }
//! ```

mod config;
mod engine;
mod lifecycle;
mod logging;

pub use config::*;
pub use engine::{CaseSettings, Engine, EngineConfig};
pub use lifecycle::{CaseExecution, run_case};
pub use logging::init_tracing;

use gridbench_core::Registry;
use gridbench_report::{ResultSink, RunSummary};

/// Run `registry` with the discovered `gridbench.toml`, or defaults when there is none.
///
/// A discovered file that fails to parse is an error rather than a silent fallback.
pub fn run(registry: &Registry, sink: &mut dyn ResultSink) -> anyhow::Result<RunSummary> {
    let config = GridConfig::discover()?.unwrap_or_default();
    run_with_config(&config, registry, sink)
}

/// Run `registry` with an explicit configuration
pub fn run_with_config(
    config: &GridConfig,
    registry: &Registry,
    sink: &mut dyn ResultSink,
) -> anyhow::Result<RunSummary> {
    let engine = Engine::new(config.engine_config()?);
    Ok(engine.run_registry(registry, sink))
}
