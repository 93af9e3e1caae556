#![warn(missing_docs)]
//! # gridbench
//!
//! Micro-benchmarking harness that turns declarative benchmark definitions
//! into reproducible, statistically summarized measurements.
//!
//! - **Parameter grids**: every declared parameter combination becomes its own case
//! - **Jobs**: each case runs under a target tag and a run strategy
//! - **Throughput strategy**: pilot-calibrated batches sampled until the relative standard error converges
//! - **Monitoring strategy**: single-shot measurement for slow or state-consuming operations
//! - **Lifecycle**: per-case state, setup and cleanup, with cleanup guaranteed on every exit path
//! - **Isolation**: per-case timeouts; failures and panics stay inside their case
//! - **Allocation diagnostics**: `TrackingAllocator` figures kept out of timed regions
//!
//! ## Quick Start
//!
//! ```ignore
//! use gridbench::prelude::*;
//! use std::collections::VecDeque;
//!
//! #[derive(Default)]
//! struct Queue {
//!     items: VecDeque<u64>,
//!     n: usize,
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.register(
//!         BenchmarkDefinition::builder::<Queue>("QueueBenchmark")
//!             .param("N", [10, 100, 1000])
//!             .setup(|q, p| {
//!                 q.n = p.require_usize("N")?;
//!                 Ok(())
//!             })
//!             .measure("EnqueueDequeue", |q, _| {
//!                 q.items.extend(0..q.n as u64);
//!                 while q.items.pop_front().is_some() {}
//!             })
//!             .jobs(JobSet::main())
//!             .build()?,
//!     )?;
//!
//!     let mut sink = CollectingSink::new();
//!     let summary = gridbench::run(&registry, &mut sink)?;
//!     println!("{}", format_human_output(sink.results(), &summary));
//!     Ok(())
//! }
//! ```
//!
//! ## Async Operations
//!
//! ```ignore
//! BenchmarkDefinition::builder::<Channel>("Async")
//!     .measure_async("RoundTrip", |c, _| {
//!         let tx = c.tx.clone();
//!         async move { tx.send(1).await }
//!     })
//! ```

// Re-export core types
pub use gridbench_core::{
    AllocationDelta, AllocationSnapshot, BenchmarkCase, BenchmarkDefinition, CancelFlag, CaseId,
    CaseOutcome, CasePhase, DEFAULT_TARGET, DefinitionBuilder, DefinitionError,
    DiagnosticsCollector, DiagnosticsSummary, FailureReason, InvalidDefinition, IterationSample,
    JobDescriptor, JobSet, Measurement, MonitoringStrategy, ParamValue, ParameterBinding,
    ParameterCombination, ParameterDeclaration, Registry, RunStrategy, Strategy, StrategyError,
    ThroughputConfig, ThroughputStrategy, Timer, TrackingAllocator, WarmupOutcome, Workload,
    build_cases, build_matrix, effective_jobs, expand_parameters, strategy_for,
    tracking_active,
};

// Re-export report types
pub use gridbench_report::{
    BenchmarkResult, ChannelSink, CollectingSink, OutputFormat, ResultSink, RunReport,
    RunSummary, SinkError, TracingSink, format_duration, format_human_output,
    generate_json_report,
};

// Re-export runner types
pub use gridbench_runner::{
    CaseSettings, Engine, EngineConfig, GridConfig, init_tracing, run, run_with_config,
};

// Re-export stats
pub use gridbench_stats::{Percentiles, SummaryStatistics, compute_summary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkDefinition, CollectingSink, Engine, EngineConfig, JobDescriptor, JobSet,
        ParameterCombination, Registry, ResultSink, RunStrategy, ThroughputConfig,
        TracingSink, TrackingAllocator, format_human_output,
    };
}
