//! Case Lifecycle
//!
//! Drives one case through `Created → SettingUp → WarmingUp → Measuring →
//! CleaningUp → Completed | Failed` on the calling thread.
//!
//! The workload lives inside a [`CleanupGuard`], so cleanup runs exactly once
//! on every exit path: normal completion, setup or iteration failure,
//! cancellation, and panics raised by user code. Panics are caught per phase
//! and reported as failures of that phase.

use crate::engine::CaseSettings;
use gridbench_core::{
    BenchmarkCase, CancelFlag, CaseOutcome, CasePhase, DiagnosticsCollector, DiagnosticsSummary,
    FailureReason, Measurement, StrategyError, WarmupOutcome, Workload, strategy_for,
};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Everything a case produced on its worker thread
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExecution {
    /// Terminal outcome
    pub outcome: CaseOutcome,
    /// Samples, complete or partial
    pub measurement: Measurement,
    /// Warmup statistics
    pub warmup: WarmupOutcome,
    /// Allocation summary for diagnosed cases
    pub diagnostics: Option<DiagnosticsSummary>,
    /// Cleanup failure message
    pub cleanup_error: Option<String>,
    /// Phases visited, in order
    pub phases: Vec<CasePhase>,
}

/// Owns a workload and runs its cleanup exactly once
struct CleanupGuard {
    workload: Box<dyn Workload>,
    cleaned: bool,
}

impl CleanupGuard {
    fn new(workload: Box<dyn Workload>) -> Self {
        Self {
            workload,
            cleaned: false,
        }
    }

    fn workload(&mut self) -> &mut dyn Workload {
        self.workload.as_mut()
    }

    /// Run cleanup if it has not run yet; returns its failure message
    fn cleanup(&mut self) -> Option<String> {
        if self.cleaned {
            return None;
        }
        self.cleaned = true;
        match catch_unwind(AssertUnwindSafe(|| self.workload.cleanup())) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(panic) => Some(format!("cleanup panicked: {}", panic_message(panic.as_ref()))),
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(err) = self.cleanup() {
            tracing::warn!("cleanup failed during unwind: {err}");
        }
    }
}

/// Human-readable text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

struct Tracker<'a> {
    case: &'a BenchmarkCase,
    phases: Vec<CasePhase>,
}

impl Tracker<'_> {
    fn enter(&mut self, phase: CasePhase) {
        tracing::debug!(case = %self.case, %phase, "phase");
        self.phases.push(phase);
    }
}

fn strategy_failure(err: StrategyError) -> (CaseOutcome, Measurement) {
    match err {
        StrategyError::Operation { message, partial } => {
            (CaseOutcome::failed(FailureReason::Iteration, message), partial)
        }
        StrategyError::Cancelled { partial } => (
            CaseOutcome::failed(FailureReason::Timeout, "cancelled after exceeding the case timeout"),
            partial,
        ),
    }
}

fn panicked(phase: &str, payload: Box<dyn Any + Send>) -> String {
    format!("{phase} panicked: {}", panic_message(payload.as_ref()))
}

/// Run `case` to completion on the current thread
pub fn run_case(case: &BenchmarkCase, settings: &CaseSettings, cancel: &CancelFlag) -> CaseExecution {
    let mut tracker = Tracker {
        case,
        phases: vec![CasePhase::Created],
    };
    let mut execution = CaseExecution {
        outcome: CaseOutcome::Completed,
        measurement: Measurement::default(),
        warmup: WarmupOutcome::default(),
        diagnostics: None,
        cleanup_error: None,
        phases: Vec::new(),
    };

    tracker.enter(CasePhase::SettingUp);
    let workload = match catch_unwind(AssertUnwindSafe(|| case.instantiate())) {
        Ok(Some(workload)) => workload,
        Ok(None) => {
            execution.outcome =
                CaseOutcome::failed(FailureReason::Setup, "operation is not part of the definition");
            return finish(execution, tracker);
        }
        Err(panic) => {
            execution.outcome =
                CaseOutcome::failed(FailureReason::Setup, panicked("state construction", panic));
            return finish(execution, tracker);
        }
    };
    let mut guard = CleanupGuard::new(workload);

    let setup = catch_unwind(AssertUnwindSafe(|| guard.workload().setup()));
    let setup_error = match setup {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:#}")),
        Err(panic) => Some(panicked("setup", panic)),
    };

    if let Some(message) = setup_error {
        execution.outcome = CaseOutcome::failed(FailureReason::Setup, message);
    } else {
        let strategy = strategy_for(case.job().strategy, &settings.throughput);

        tracker.enter(CasePhase::WarmingUp);
        let warmup = catch_unwind(AssertUnwindSafe(|| strategy.warmup(guard.workload(), cancel)));
        let warmed = match warmup {
            Ok(Ok(outcome)) => {
                execution.warmup = outcome;
                true
            }
            Ok(Err(err)) => {
                (execution.outcome, execution.measurement) = strategy_failure(err);
                false
            }
            Err(panic) => {
                execution.outcome =
                    CaseOutcome::failed(FailureReason::Iteration, panicked("warmup", panic));
                false
            }
        };

        if warmed {
            tracker.enter(CasePhase::Measuring);
            let mut diagnostics = settings.memory_diagnoser.then(DiagnosticsCollector::new);
            let measured = catch_unwind(AssertUnwindSafe(|| {
                strategy.measure(guard.workload(), diagnostics.as_mut(), cancel)
            }));
            match measured {
                Ok(Ok(measurement)) => execution.measurement = measurement,
                Ok(Err(err)) => (execution.outcome, execution.measurement) = strategy_failure(err),
                Err(panic) => {
                    execution.outcome = CaseOutcome::failed(
                        FailureReason::Iteration,
                        panicked("measured invocation", panic),
                    );
                }
            }
            execution.diagnostics = diagnostics.and_then(|d| d.summary());
        }
    }

    tracker.enter(CasePhase::CleaningUp);
    execution.cleanup_error = guard.cleanup();
    if let Some(err) = &execution.cleanup_error {
        tracing::warn!(case = %case, "cleanup failed: {err}");
    }
    drop(guard);

    finish(execution, tracker)
}

fn finish(mut execution: CaseExecution, mut tracker: Tracker<'_>) -> CaseExecution {
    tracker.enter(execution.outcome.terminal_phase());
    execution.phases = tracker.phases;
    execution
}
