//! Engine
//!
//! Expands definitions into the job matrix and runs the cases strictly one
//! at a time. Each case runs on its own named thread while the engine waits
//! with a timeout. When the timeout fires the engine raises the case's
//! cancellation flag, gives it a grace period to reach cleanup, and abandons
//! the thread if it still has not finished.

use crate::lifecycle::{self, CaseExecution};
use crossbeam::channel::{self, RecvTimeoutError};
use gridbench_core::{
    BenchmarkCase, BenchmarkDefinition, CancelFlag, CaseOutcome, FailureReason, JobDescriptor,
    Registry, ThroughputConfig, build_matrix, duration_nanos, pin_to_cpu,
};
use gridbench_report::{BenchmarkResult, ResultSink, RunSummary, summarize};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Default per-case timeout
    pub timeout: Duration,
    /// Time a cancelled case gets to reach cleanup before it is abandoned
    pub cleanup_grace: Duration,
    /// Default throughput tuning
    pub throughput: ThroughputConfig,
    /// Collect allocation figures for every case
    pub memory_diagnoser: bool,
    /// Jobs for definitions without their own job list
    pub jobs: Vec<JobDescriptor>,
    /// Pin case threads to this CPU
    pub pin_cpu: Option<usize>,
    /// Show a progress bar
    pub progress: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            cleanup_grace: Duration::from_secs(2),
            throughput: ThroughputConfig::default(),
            memory_diagnoser: false,
            jobs: Vec::new(),
            pin_cpu: None,
            progress: false,
        }
    }
}

impl EngineConfig {
    /// Settings for cases of `definition`, with its overrides applied
    pub fn resolve_for(&self, definition: &BenchmarkDefinition) -> CaseSettings {
        CaseSettings {
            timeout: definition.timeout().unwrap_or(self.timeout),
            throughput: definition
                .throughput()
                .cloned()
                .unwrap_or_else(|| self.throughput.clone()),
            memory_diagnoser: self.memory_diagnoser || definition.memory_diagnoser(),
            pin_cpu: self.pin_cpu,
        }
    }
}

/// Effective settings for one case
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSettings {
    /// Wall-clock limit for the whole lifecycle
    pub timeout: Duration,
    /// Throughput tuning
    pub throughput: ThroughputConfig,
    /// Whether to collect allocation figures
    pub memory_diagnoser: bool,
    /// CPU to pin the case thread to
    pub pin_cpu: Option<usize>,
}

/// Runs job matrices and feeds results to a sink
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

enum Waited {
    Finished(CaseExecution),
    TimedOut(Option<CaseExecution>),
    Lost,
}

impl Engine {
    /// Engine with the given settings
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every definition in `registry`
    pub fn run_registry(&self, registry: &Registry, sink: &mut dyn ResultSink) -> RunSummary {
        self.run(registry.definitions(), sink)
    }

    /// Run the job matrix of `definitions`, one case at a time
    pub fn run(
        &self,
        definitions: &[Arc<BenchmarkDefinition>],
        sink: &mut dyn ResultSink,
    ) -> RunSummary {
        let started = Instant::now();
        let cases = build_matrix(definitions, &self.config.jobs);
        tracing::info!(
            definitions = definitions.len(),
            cases = cases.len(),
            "starting run"
        );

        let pb = self.config.progress.then(|| {
            let pb = ProgressBar::new(cases.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        });

        let mut summary = RunSummary::default();
        for case in cases {
            if let Some(pb) = &pb {
                pb.set_message(case.to_string());
            }

            let result = self.run_case(case);
            summary.record(&result);

            let case_id = result.id.to_string();
            if let Err(e) = sink.accept(result) {
                summary.sink_errors += 1;
                tracing::warn!(case = %case_id, "result sink rejected result: {e}");
            }

            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        summary.duration_ns = duration_nanos(started.elapsed());
        tracing::info!(
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed(),
            sink_errors = summary.sink_errors,
            "run finished"
        );
        summary
    }

    /// Run one case on a dedicated thread and finalize its result
    pub fn run_case(&self, case: BenchmarkCase) -> BenchmarkResult {
        let settings = self.config.resolve_for(case.definition());
        let started = Instant::now();
        let cancel = CancelFlag::new();
        let (tx, rx) = channel::bounded::<CaseExecution>(1);

        let spawned = {
            let case = case.clone();
            let settings = settings.clone();
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("gridbench-{}", case.definition().name()))
                .spawn(move || {
                    if let Some(cpu) = settings.pin_cpu {
                        if let Err(e) = pin_to_cpu(cpu) {
                            tracing::warn!(cpu, "failed to pin case thread: {e}");
                        }
                    }
                    let execution = lifecycle::run_case(&case, &settings, &cancel);
                    // The engine may have given up on this case already.
                    let _ = tx.send(execution);
                })
        };

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                let outcome = CaseOutcome::failed(
                    FailureReason::Setup,
                    format!("failed to spawn case thread: {e}"),
                );
                return finalize(&case, outcome, None, started);
            }
        };

        let waited = match rx.recv_timeout(settings.timeout) {
            Ok(execution) => Waited::Finished(execution),
            Err(RecvTimeoutError::Disconnected) => Waited::Lost,
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                tracing::debug!(case = %case, timeout = ?settings.timeout, "case timed out, cancelling");
                match rx.recv_timeout(self.config.cleanup_grace) {
                    Ok(execution) => Waited::TimedOut(Some(execution)),
                    Err(_) => Waited::TimedOut(None),
                }
            }
        };

        match waited {
            Waited::Finished(execution) => {
                let _ = handle.join();
                let outcome = execution.outcome.clone();
                finalize(&case, outcome, Some(execution), started)
            }
            Waited::TimedOut(execution) => {
                if execution.is_some() {
                    let _ = handle.join();
                } else {
                    tracing::warn!(
                        case = %case,
                        grace = ?self.config.cleanup_grace,
                        "abandoning case thread that did not reach cleanup; its resources may outlive the case"
                    );
                }
                let outcome = CaseOutcome::failed(
                    FailureReason::Timeout,
                    format!("exceeded timeout of {:?}", settings.timeout),
                );
                finalize(&case, outcome, execution, started)
            }
            Waited::Lost => {
                let _ = handle.join();
                let outcome = CaseOutcome::failed(
                    FailureReason::Iteration,
                    "case thread exited without reporting a result",
                );
                finalize(&case, outcome, None, started)
            }
        }
    }
}

fn finalize(
    case: &BenchmarkCase,
    outcome: CaseOutcome,
    execution: Option<CaseExecution>,
    started: Instant,
) -> BenchmarkResult {
    let execution = execution.unwrap_or_else(|| CaseExecution {
        outcome: outcome.clone(),
        measurement: Default::default(),
        warmup: Default::default(),
        diagnostics: None,
        cleanup_error: None,
        phases: Vec::new(),
    });
    let measurement = execution.measurement;

    let result = BenchmarkResult {
        id: case.id(),
        categories: case.definition().categories().to_vec(),
        statistics: summarize(&measurement.samples),
        ops_per_sample: measurement.batch_size,
        total_operations: measurement.total_operations(),
        samples: measurement.samples,
        warmup_invocations: execution.warmup.invocations,
        warmup_capped: execution.warmup.capped,
        pilot_capped: measurement.pilot_capped,
        diagnostics: execution.diagnostics,
        cleanup_error: execution.cleanup_error,
        outcome,
        duration_ns: duration_nanos(started.elapsed()),
        completed_at: chrono::Utc::now(),
    };

    match &result.outcome {
        CaseOutcome::Completed => tracing::info!(
            case = %result.id,
            samples = result.sample_count(),
            mean_ns = result.mean_ns(),
            "case completed"
        ),
        CaseOutcome::Failed { reason, message } => tracing::warn!(
            case = %result.id,
            %reason,
            samples = result.sample_count(),
            "case failed: {message}"
        ),
    }
    result
}
