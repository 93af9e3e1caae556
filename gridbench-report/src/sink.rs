//! Result Sinks
//!
//! The engine hands every finalized result to a [`ResultSink`] in completion
//! order. A sink that errors is logged and counted by the engine; the run
//! carries on.

use crate::result::BenchmarkResult;
use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use std::time::Duration;
use thiserror::Error;

/// Why a sink refused a result
#[derive(Debug, Error)]
pub enum SinkError {
    /// The consuming side has gone away
    #[error("result consumer disconnected")]
    Disconnected,

    /// The consumer did not make room in time
    #[error("result consumer did not accept a result within {0:?}")]
    Unresponsive(Duration),

    /// Sink-specific failure
    #[error("{0}")]
    Other(String),
}

/// Receiver of finalized results
pub trait ResultSink {
    /// Accept one result
    fn accept(&mut self, result: BenchmarkResult) -> Result<(), SinkError>;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn accept(&mut self, result: BenchmarkResult) -> Result<(), SinkError> {
        (**self).accept(result)
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn accept(&mut self, result: BenchmarkResult) -> Result<(), SinkError> {
        (**self).accept(result)
    }
}

/// Keeps every result in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    results: Vec<BenchmarkResult>,
}

impl CollectingSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Results received so far
    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    /// Take the received results
    pub fn into_results(self) -> Vec<BenchmarkResult> {
        self.results
    }
}

impl ResultSink for CollectingSink {
    fn accept(&mut self, result: BenchmarkResult) -> Result<(), SinkError> {
        self.results.push(result);
        Ok(())
    }
}

/// Logs one line per result
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn accept(&mut self, result: BenchmarkResult) -> Result<(), SinkError> {
        let case = result.id.to_string();
        match &result.statistics {
            Some(stats) => tracing::info!(
                %case,
                status = %result.outcome.terminal_phase(),
                samples = stats.sample_count,
                mean_ns = stats.mean,
                median_ns = stats.median,
                std_dev_ns = result.std_dev_ns(),
                "result"
            ),
            None => tracing::info!(
                %case,
                status = %result.outcome.terminal_phase(),
                samples = 0,
                "result"
            ),
        }
        Ok(())
    }
}

/// Forwards results over a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<BenchmarkResult>,
    send_timeout: Duration,
}

impl ChannelSink {
    /// Sink plus the receiving end of a channel holding at most `capacity` results.
    ///
    /// A send that cannot complete within `send_timeout` fails with
    /// [`SinkError::Unresponsive`] instead of blocking the engine.
    pub fn bounded(capacity: usize, send_timeout: Duration) -> (Self, Receiver<BenchmarkResult>) {
        let (sender, receiver) = channel::bounded(capacity);
        (
            Self {
                sender,
                send_timeout,
            },
            receiver,
        )
    }
}

impl ResultSink for ChannelSink {
    fn accept(&mut self, result: BenchmarkResult) -> Result<(), SinkError> {
        self.sender
            .send_timeout(result, self.send_timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SinkError::Unresponsive(self.send_timeout),
                SendTimeoutError::Disconnected(_) => SinkError::Disconnected,
            })
    }
}
