//! Measured samples

use crate::diagnostics::AllocationDelta;
use serde::{Deserialize, Serialize};

/// One measured data point.
///
/// For throughput blocks `duration_nanos` is the block time divided by the
/// number of operations in the block, so samples are always per operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationSample {
    /// Elapsed time per operation, in nanoseconds
    pub duration_nanos: f64,
    /// Operations executed to produce this sample
    pub operations: u64,
    /// Allocation annotation, present only for diagnosed single-shot samples
    pub allocation: Option<AllocationDelta>,
}

impl IterationSample {
    /// Sample from a timed block of `operations` back-to-back invocations
    #[inline]
    pub fn from_block(block_nanos: u64, operations: u64) -> Self {
        let operations = operations.max(1);
        Self {
            duration_nanos: block_nanos as f64 / operations as f64,
            operations,
            allocation: None,
        }
    }

    /// Attach an allocation annotation
    pub fn with_allocation(mut self, delta: AllocationDelta) -> Self {
        self.allocation = Some(delta);
        self
    }
}

/// Per-operation durations of `samples`, ready for the statistics crate
pub fn durations(samples: &[IterationSample]) -> Vec<f64> {
    samples.iter().map(|s| s.duration_nanos).collect()
}
