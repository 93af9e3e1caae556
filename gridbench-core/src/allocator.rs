//! Allocation Tracking
//!
//! `TrackingAllocator` wraps the system allocator and keeps three process-wide
//! counters: bytes allocated, number of allocations, and bytes freed. The
//! counters only ever grow. Nothing in gridbench resets them; diagnostics read
//! two snapshots and subtract, so one case can never disturb another case's
//! numbers.
//!
//! Install it in the benchmark binary to enable memory diagnostics:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: gridbench::TrackingAllocator = gridbench::TrackingAllocator;
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static FREED_BYTES: AtomicU64 = AtomicU64::new(0);

/// Global allocator that counts allocation traffic
pub struct TrackingAllocator;

// SAFETY: every method forwards to `System` with the caller's arguments
// unchanged; the counters are side bookkeeping only.
unsafe impl GlobalAlloc for TrackingAllocator {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        FREED_BYTES.fetch_add(layout.size() as u64, Ordering::Relaxed);
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            // A move-and-grow is a fresh allocation plus a release of the old block.
            record_alloc(new_size);
            FREED_BYTES.fetch_add(layout.size() as u64, Ordering::Relaxed);
        }
        new_ptr
    }
}

#[inline(always)]
fn record_alloc(size: usize) {
    ALLOCATED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
}

/// Point-in-time reading of the cumulative counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationSnapshot {
    /// Bytes allocated since process start
    pub allocated_bytes: u64,
    /// Allocations since process start
    pub allocations: u64,
    /// Bytes freed since process start
    pub freed_bytes: u64,
}

impl AllocationSnapshot {
    /// Read the counters now
    #[inline]
    pub fn now() -> Self {
        Self {
            allocated_bytes: ALLOCATED_BYTES.load(Ordering::Relaxed),
            allocations: ALLOCATIONS.load(Ordering::Relaxed),
            freed_bytes: FREED_BYTES.load(Ordering::Relaxed),
        }
    }
}

/// Whether `TrackingAllocator` is serving this process.
///
/// Any running Rust program has allocated by the time benchmarks start, so a
/// zero allocation count means the tracking allocator is not installed.
pub fn tracking_active() -> bool {
    ALLOCATIONS.load(Ordering::Relaxed) > 0
}
