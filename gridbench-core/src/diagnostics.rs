//! Memory Diagnostics
//!
//! A `DiagnosticsCollector` belongs to exactly one case and is created only
//! when that case asks for memory diagnostics. It brackets work with
//! allocation snapshots taken outside any timed region and keeps per-operation
//! deltas. Cases without diagnostics never construct one, so their timed
//! regions contain nothing but the operation.

use crate::allocator::{AllocationSnapshot, tracking_active};
use serde::{Deserialize, Serialize};
use std::sync::Once;

static INACTIVE_WARNING: Once = Once::new();

/// Allocation traffic attributed to one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllocationDelta {
    /// Bytes allocated per operation
    pub allocated_bytes: u64,
    /// Allocations per operation
    pub allocations: u64,
    /// Bytes still held afterwards (allocated minus freed), per operation
    pub retained_bytes: u64,
    /// The raw retained figure was negative and has been clamped to zero
    pub imprecise: bool,
}

impl AllocationDelta {
    /// Delta between two snapshots, divided evenly across `ops` operations.
    ///
    /// Net retention goes negative when the measured work frees memory it did
    /// not allocate (or when another thread frees concurrently). That figure
    /// is clamped to zero and flagged instead of being reported as negative.
    pub fn between(before: &AllocationSnapshot, after: &AllocationSnapshot, ops: u64) -> Self {
        let ops = ops.max(1);
        let allocated = after.allocated_bytes.saturating_sub(before.allocated_bytes);
        let allocations = after.allocations.saturating_sub(before.allocations);
        let freed = after.freed_bytes.saturating_sub(before.freed_bytes);

        let net = i128::from(allocated) - i128::from(freed);
        let (retained, imprecise) = if net < 0 {
            (0, true)
        } else {
            (u64::try_from(net).unwrap_or(u64::MAX), false)
        };

        Self {
            allocated_bytes: allocated / ops,
            allocations: allocations / ops,
            retained_bytes: retained / ops,
            imprecise,
        }
    }
}

/// Per-case allocation summary attached to a result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    /// Number of diagnostic passes recorded
    pub passes: usize,
    /// Mean bytes allocated per operation
    pub allocated_bytes_per_op: f64,
    /// Mean allocations per operation
    pub allocations_per_op: f64,
    /// Mean bytes retained per operation
    pub retained_bytes_per_op: f64,
    /// Largest per-operation allocation seen in any pass
    pub max_allocated_bytes_per_op: u64,
    /// At least one pass had its retained figure clamped
    pub imprecise: bool,
    /// Whether the tracking allocator was installed while sampling
    pub tracking_active: bool,
}

/// Collects allocation deltas for a single case
#[derive(Debug)]
pub struct DiagnosticsCollector {
    deltas: Vec<AllocationDelta>,
    tracking_active: bool,
}

impl DiagnosticsCollector {
    /// Create a collector for one case.
    ///
    /// Logs a single process-wide warning when the tracking allocator is not
    /// installed; the collector still works but every delta will be zero.
    pub fn new() -> Self {
        let active = tracking_active();
        if !active {
            INACTIVE_WARNING.call_once(|| {
                tracing::warn!(
                    "memory diagnostics requested but TrackingAllocator is not the global allocator; allocation figures will be zero"
                );
            });
        }
        Self {
            deltas: Vec::new(),
            tracking_active: active,
        }
    }

    /// Take the snapshot that opens a diagnostic window
    #[inline]
    pub fn begin(&self) -> AllocationSnapshot {
        AllocationSnapshot::now()
    }

    /// Close a window opened by [`begin`](Self::begin) that covered `ops` operations.
    #[inline]
    pub fn end(&mut self, before: AllocationSnapshot, ops: u64) -> AllocationDelta {
        let after = AllocationSnapshot::now();
        let delta = AllocationDelta::between(&before, &after, ops);
        self.deltas.push(delta);
        delta
    }

    /// Deltas recorded so far
    pub fn deltas(&self) -> &[AllocationDelta] {
        &self.deltas
    }

    /// Reduce recorded deltas; `None` if nothing was recorded
    pub fn summary(&self) -> Option<DiagnosticsSummary> {
        if self.deltas.is_empty() {
            return None;
        }
        let n = self.deltas.len() as f64;
        let mean = |f: fn(&AllocationDelta) -> u64| {
            self.deltas.iter().map(|d| f(d) as f64).sum::<f64>() / n
        };

        Some(DiagnosticsSummary {
            passes: self.deltas.len(),
            allocated_bytes_per_op: mean(|d| d.allocated_bytes),
            allocations_per_op: mean(|d| d.allocations),
            retained_bytes_per_op: mean(|d| d.retained_bytes),
            max_allocated_bytes_per_op: self
                .deltas
                .iter()
                .map(|d| d.allocated_bytes)
                .max()
                .unwrap_or(0),
            imprecise: self.deltas.iter().any(|d| d.imprecise),
            tracking_active: self.tracking_active,
        })
    }
}

impl Default for DiagnosticsCollector {
    fn default() -> Self {
        Self::new()
    }
}
