#![warn(missing_docs)]
//! gridbench Core - Definitions and Measurement
//!
//! This crate provides everything needed to describe and measure a case:
//! - `BenchmarkDefinition` builder with parameters, operations and lifecycle callables
//! - Parameter expansion and the job matrix
//! - Throughput and monitoring run strategies
//! - Global allocator interceptor for memory diagnostics
//! - Wall-clock timing and CPU affinity pinning

mod allocator;
mod case;
mod definition;
mod diagnostics;
mod error;
mod job;
mod matrix;
mod measure;
mod params;
mod registry;
mod sample;
mod strategy;
mod workload;

pub use allocator::{AllocationSnapshot, TrackingAllocator, tracking_active};
pub use case::{BenchmarkCase, CaseId, CaseOutcome, CasePhase, FailureReason};
pub use definition::{BenchmarkDefinition, DefinitionBuilder};
pub use diagnostics::{AllocationDelta, DiagnosticsCollector, DiagnosticsSummary};
pub use error::{DefinitionError, InvalidDefinition};
pub use job::{DEFAULT_TARGET, JobDescriptor, JobSet, RunStrategy};
pub use matrix::{build_cases, build_matrix, effective_jobs};
pub use measure::{Timer, duration_nanos, pin_to_cpu};
pub use params::{
    ParamValue, ParameterBinding, ParameterCombination, ParameterDeclaration, expand_parameters,
    validate_parameters,
};
pub use registry::Registry;
pub use sample::{IterationSample, durations};
pub use strategy::{
    CancelFlag, Measurement, MonitoringStrategy, Strategy, StrategyError, ThroughputConfig,
    ThroughputStrategy, WarmupOutcome, strategy_for,
};
pub use workload::Workload;
