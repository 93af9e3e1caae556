//! Run Strategies
//!
//! A strategy decides how a prepared workload is warmed up and how its
//! measured samples are produced.
//!
//! - **Throughput** warms up for a time budget, runs a pilot that doubles the
//!   batch size until one block is long enough to time reliably, then samples
//!   blocks of that size until the relative standard error of the mean drops
//!   under a target (bounded by a minimum and maximum block count).
//! - **Monitoring** is single-shot: one warmup invocation and one measured
//!   invocation, for operations that are slow or consume their state.
//!
//! Both strategies check the cancellation flag between invocations and keep
//! whatever samples they have when an invocation fails or the case is
//! cancelled.

use crate::diagnostics::DiagnosticsCollector;
use crate::job::RunStrategy;
use crate::measure::{Timer, duration_nanos};
use crate::sample::IterationSample;
use crate::workload::Workload;
use gridbench_stats::relative_standard_error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Cooperative cancellation signal shared between the engine and a case
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// New, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Tuning for the throughput strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    /// Time spent invoking the operation before the pilot
    #[serde(with = "duration_millis")]
    pub warmup_time: Duration,
    /// Soft cap on warmup invocations; hitting it ends warmup early
    pub max_warmup_iterations: u64,
    /// Shortest block the pilot accepts as reliably timeable
    #[serde(with = "duration_millis")]
    pub min_block_time: Duration,
    /// Largest batch the pilot will grow to
    pub max_batch_size: u64,
    /// Blocks always measured before the error target is consulted
    pub min_blocks: usize,
    /// Hard ceiling on measured blocks
    pub max_blocks: usize,
    /// Stop once the relative standard error of the mean is at or below this
    pub target_relative_error: f64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            warmup_time: Duration::from_millis(500),
            max_warmup_iterations: 10_000_000,
            min_block_time: Duration::from_millis(100),
            max_batch_size: 1 << 30,
            min_blocks: 15,
            max_blocks: 100,
            target_relative_error: 0.02,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// What warmup did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupOutcome {
    /// Invocations performed
    pub invocations: u64,
    /// Warmup stopped at the iteration cap rather than the time budget
    pub capped: bool,
}

/// Samples produced by a strategy's measurement phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    /// Measured samples, in order
    pub samples: Vec<IterationSample>,
    /// Operations per measured sample
    pub batch_size: u64,
    /// The pilot reached the maximum batch size without meeting the block time
    pub pilot_capped: bool,
}

impl Measurement {
    /// Operations executed across all measured samples
    pub fn total_operations(&self) -> u64 {
        self.samples.iter().map(|s| s.operations).sum()
    }
}

/// Why a strategy stopped before finishing
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The operation returned an error or panicked
    #[error("operation failed: {message}")]
    Operation {
        /// Rendered error chain
        message: String,
        /// Samples collected before the failure
        partial: Measurement,
    },

    /// The cancellation flag was observed
    #[error("cancelled")]
    Cancelled {
        /// Samples collected before cancellation
        partial: Measurement,
    },
}

impl StrategyError {
    /// Samples gathered before the strategy stopped
    pub fn into_partial(self) -> Measurement {
        match self {
            StrategyError::Operation { partial, .. } | StrategyError::Cancelled { partial } => {
                partial
            }
        }
    }

    fn operation(err: anyhow::Error, partial: Measurement) -> Self {
        StrategyError::Operation {
            message: format!("{err:#}"),
            partial,
        }
    }
}

/// A way of warming up and measuring a workload
pub trait Strategy {
    /// Which strategy this is
    fn kind(&self) -> RunStrategy;

    /// Run unmeasured invocations ahead of measurement
    fn warmup(
        &self,
        workload: &mut dyn Workload,
        cancel: &CancelFlag,
    ) -> Result<WarmupOutcome, StrategyError>;

    /// Produce measured samples.
    ///
    /// `diagnostics` is `Some` only for cases with memory diagnostics enabled.
    fn measure(
        &self,
        workload: &mut dyn Workload,
        diagnostics: Option<&mut DiagnosticsCollector>,
        cancel: &CancelFlag,
    ) -> Result<Measurement, StrategyError>;
}

/// Strategy implementation for `kind`
pub fn strategy_for(kind: RunStrategy, throughput: &ThroughputConfig) -> Box<dyn Strategy> {
    match kind {
        RunStrategy::Throughput => Box::new(ThroughputStrategy::new(throughput.clone())),
        RunStrategy::Monitoring => Box::new(MonitoringStrategy),
    }
}

/// Batched statistical sampling
#[derive(Debug, Clone, Default)]
pub struct ThroughputStrategy {
    config: ThroughputConfig,
}

impl ThroughputStrategy {
    /// Strategy with the given tuning
    pub fn new(config: ThroughputConfig) -> Self {
        Self { config }
    }

    /// Tuning in use
    pub fn config(&self) -> &ThroughputConfig {
        &self.config
    }

    /// Grow the batch until one block meets `min_block_time`.
    ///
    /// Returns the batch size and whether the size cap was hit first.
    fn pilot(
        &self,
        workload: &mut dyn Workload,
        cancel: &CancelFlag,
    ) -> Result<(u64, bool), StrategyError> {
        let max_batch = self.config.max_batch_size.max(1);
        let min_block_ns = duration_nanos(self.config.min_block_time);
        let mut batch = 1u64;

        loop {
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled {
                    partial: Measurement::default(),
                });
            }

            let timer = Timer::start();
            workload
                .run(batch)
                .map_err(|e| StrategyError::operation(e, Measurement::default()))?;
            let elapsed = timer.stop();

            if elapsed >= min_block_ns {
                return Ok((batch, false));
            }
            if batch >= max_batch {
                tracing::debug!(
                    batch,
                    elapsed_ns = elapsed,
                    "pilot reached the batch size cap below the minimum block time"
                );
                return Ok((batch, true));
            }
            batch = batch.saturating_mul(2).min(max_batch);
        }
    }
}

impl Strategy for ThroughputStrategy {
    fn kind(&self) -> RunStrategy {
        RunStrategy::Throughput
    }

    fn warmup(
        &self,
        workload: &mut dyn Workload,
        cancel: &CancelFlag,
    ) -> Result<WarmupOutcome, StrategyError> {
        let timer = Timer::start();
        let mut outcome = WarmupOutcome::default();

        loop {
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled {
                    partial: Measurement::default(),
                });
            }
            if outcome.invocations >= self.config.max_warmup_iterations {
                outcome.capped = true;
                tracing::debug!(
                    invocations = outcome.invocations,
                    "warmup stopped at the iteration cap"
                );
                break;
            }
            if outcome.invocations > 0 && timer.elapsed() >= self.config.warmup_time {
                break;
            }

            workload
                .run(1)
                .map_err(|e| StrategyError::operation(e, Measurement::default()))?;
            outcome.invocations += 1;
        }

        Ok(outcome)
    }

    fn measure(
        &self,
        workload: &mut dyn Workload,
        diagnostics: Option<&mut DiagnosticsCollector>,
        cancel: &CancelFlag,
    ) -> Result<Measurement, StrategyError> {
        let (batch_size, pilot_capped) = self.pilot(workload, cancel)?;

        let min_blocks = self.config.min_blocks;
        let max_blocks = self.config.max_blocks.max(min_blocks).max(1);
        let mut measurement = Measurement {
            samples: Vec::with_capacity(max_blocks),
            batch_size,
            pilot_capped,
        };
        let mut block_times: Vec<f64> = Vec::with_capacity(max_blocks);

        loop {
            let blocks = measurement.samples.len();
            if blocks >= max_blocks {
                break;
            }
            if blocks >= min_blocks
                && relative_standard_error(&block_times) <= self.config.target_relative_error
            {
                break;
            }
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled {
                    partial: measurement,
                });
            }

            let timer = Timer::start();
            if let Err(e) = workload.run(batch_size) {
                return Err(StrategyError::operation(e, measurement));
            }
            let elapsed = timer.stop();

            let sample = IterationSample::from_block(elapsed, batch_size);
            block_times.push(sample.duration_nanos);
            measurement.samples.push(sample);
        }

        // Allocation figures come from a separate untimed block so that the
        // snapshots never sit inside a measured region.
        if let Some(diagnostics) = diagnostics {
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled {
                    partial: measurement,
                });
            }
            let before = diagnostics.begin();
            if let Err(e) = workload.run(batch_size) {
                return Err(StrategyError::operation(e, measurement));
            }
            diagnostics.end(before, batch_size);
        }

        Ok(measurement)
    }
}

/// Single warmup plus single measured invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitoringStrategy;

impl Strategy for MonitoringStrategy {
    fn kind(&self) -> RunStrategy {
        RunStrategy::Monitoring
    }

    fn warmup(
        &self,
        workload: &mut dyn Workload,
        cancel: &CancelFlag,
    ) -> Result<WarmupOutcome, StrategyError> {
        if cancel.is_cancelled() {
            return Err(StrategyError::Cancelled {
                partial: Measurement::default(),
            });
        }
        workload
            .run(1)
            .map_err(|e| StrategyError::operation(e, Measurement::default()))?;
        Ok(WarmupOutcome {
            invocations: 1,
            capped: false,
        })
    }

    fn measure(
        &self,
        workload: &mut dyn Workload,
        diagnostics: Option<&mut DiagnosticsCollector>,
        cancel: &CancelFlag,
    ) -> Result<Measurement, StrategyError> {
        let mut measurement = Measurement {
            samples: Vec::with_capacity(1),
            batch_size: 1,
            pilot_capped: false,
        };
        if cancel.is_cancelled() {
            return Err(StrategyError::Cancelled {
                partial: measurement,
            });
        }

        let before = diagnostics.as_ref().map(|d| d.begin());
        let timer = Timer::start();
        let result = workload.run(1);
        let elapsed = timer.stop();
        if let Err(e) = result {
            return Err(StrategyError::operation(e, measurement));
        }

        let mut sample = IterationSample::from_block(elapsed, 1);
        if let (Some(diagnostics), Some(before)) = (diagnostics, before) {
            sample = sample.with_allocation(diagnostics.end(before, 1));
        }
        measurement.samples.push(sample);
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts invocations, optionally spinning and failing at a given call
    #[derive(Default)]
    struct Probe {
        calls: u64,
        spin: Duration,
        fail_at: Option<u64>,
    }

    impl Workload for Probe {
        fn setup(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        fn run(&mut self, ops: u64) -> anyhow::Result<()> {
            for _ in 0..ops {
                self.calls += 1;
                if Some(self.calls) == self.fail_at {
                    anyhow::bail!("boom at call {}", self.calls);
                }
                if !self.spin.is_zero() {
                    let start = std::time::Instant::now();
                    while start.elapsed() < self.spin {
                        std::hint::spin_loop();
                    }
                }
            }
            Ok(())
        }

        fn cleanup(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn quick_config() -> ThroughputConfig {
        ThroughputConfig {
            warmup_time: Duration::from_millis(5),
            min_block_time: Duration::from_micros(200),
            min_blocks: 5,
            max_blocks: 8,
            ..ThroughputConfig::default()
        }
    }

    #[test]
    fn monitoring_is_single_shot() {
        let strategy = MonitoringStrategy;
        let mut probe = Probe::default();
        let cancel = CancelFlag::new();

        let warmup = strategy.warmup(&mut probe, &cancel).unwrap();
        let measurement = strategy.measure(&mut probe, None, &cancel).unwrap();

        assert_eq!(warmup.invocations, 1);
        assert_eq!(measurement.samples.len(), 1);
        assert_eq!(measurement.samples[0].operations, 1);
        assert!(measurement.samples[0].allocation.is_none());
        assert_eq!(probe.calls, 2);
    }

    #[test]
    fn monitoring_annotates_sample_when_diagnosed() {
        let mut probe = Probe::default();
        let mut diagnostics = DiagnosticsCollector::new();
        let measurement = MonitoringStrategy
            .measure(&mut probe, Some(&mut diagnostics), &CancelFlag::new())
            .unwrap();

        assert!(measurement.samples[0].allocation.is_some());
        assert_eq!(diagnostics.deltas().len(), 1);
    }

    #[test]
    fn throughput_respects_block_bounds() {
        let strategy = ThroughputStrategy::new(quick_config());
        let mut probe = Probe::default();
        let cancel = CancelFlag::new();

        strategy.warmup(&mut probe, &cancel).unwrap();
        let measurement = strategy.measure(&mut probe, None, &cancel).unwrap();

        let n = measurement.samples.len();
        assert!((5..=8).contains(&n), "got {n} blocks");
        assert!(measurement.batch_size >= 1);
        assert!(
            measurement
                .samples
                .iter()
                .all(|s| s.operations == measurement.batch_size)
        );
        assert_eq!(measurement.total_operations(), n as u64 * measurement.batch_size);
    }

    #[test]
    fn max_blocks_below_min_is_raised() {
        let config = ThroughputConfig {
            min_blocks: 4,
            max_blocks: 1,
            // Unreachable target forces the block ceiling to decide.
            target_relative_error: -1.0,
            ..quick_config()
        };
        let measurement = ThroughputStrategy::new(config)
            .measure(&mut Probe::default(), None, &CancelFlag::new())
            .unwrap();
        assert_eq!(measurement.samples.len(), 4);
    }

    #[test]
    fn pilot_reports_batch_cap() {
        let config = ThroughputConfig {
            min_block_time: Duration::from_secs(3600),
            max_batch_size: 16,
            min_blocks: 2,
            max_blocks: 2,
            ..quick_config()
        };
        let measurement = ThroughputStrategy::new(config)
            .measure(&mut Probe::default(), None, &CancelFlag::new())
            .unwrap();
        assert!(measurement.pilot_capped);
        assert_eq!(measurement.batch_size, 16);
    }

    #[test]
    fn warmup_stops_at_iteration_cap() {
        let config = ThroughputConfig {
            warmup_time: Duration::from_secs(3600),
            max_warmup_iterations: 50,
            ..quick_config()
        };
        let mut probe = Probe::default();
        let outcome = ThroughputStrategy::new(config)
            .warmup(&mut probe, &CancelFlag::new())
            .unwrap();
        assert_eq!(outcome.invocations, 50);
        assert!(outcome.capped);
        assert_eq!(probe.calls, 50);
    }

    #[test]
    fn failure_keeps_partial_samples() {
        let config = ThroughputConfig {
            min_block_time: Duration::ZERO,
            min_blocks: 10,
            max_blocks: 10,
            ..quick_config()
        };
        // Pilot takes call 1; blocks of one op follow, so call 5 is block 4.
        let mut probe = Probe {
            fail_at: Some(5),
            ..Probe::default()
        };
        let err = ThroughputStrategy::new(config)
            .measure(&mut probe, None, &CancelFlag::new())
            .unwrap_err();

        assert!(err.to_string().contains("boom at call 5"));
        assert_eq!(err.into_partial().samples.len(), 3);
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = MonitoringStrategy
            .warmup(&mut Probe::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, StrategyError::Cancelled { .. }));
    }

    #[test]
    fn throughput_diagnostics_run_outside_blocks() {
        let config = ThroughputConfig {
            min_block_time: Duration::ZERO,
            min_blocks: 3,
            max_blocks: 3,
            ..quick_config()
        };
        let mut probe = Probe::default();
        let mut diagnostics = DiagnosticsCollector::new();
        let measurement = ThroughputStrategy::new(config)
            .measure(&mut probe, Some(&mut diagnostics), &CancelFlag::new())
            .unwrap();

        assert_eq!(measurement.samples.len(), 3);
        assert!(measurement.samples.iter().all(|s| s.allocation.is_none()));
        assert_eq!(diagnostics.deltas().len(), 1);
        // pilot + three blocks + one diagnostic block, one op each
        assert_eq!(probe.calls, 5);
    }

    #[test]
    fn config_round_trips_through_toml_shape() {
        let config: ThroughputConfig =
            serde_json::from_str(r#"{"warmup_time": 50, "min_blocks": 3}"#).unwrap();
        assert_eq!(config.warmup_time, Duration::from_millis(50));
        assert_eq!(config.min_blocks, 3);
        assert_eq!(config.max_blocks, 100);
    }
}
