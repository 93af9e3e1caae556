//! Timing
//!
//! Wall-clock timing for measured blocks, plus optional CPU pinning of the
//! thread that runs a case.

use std::time::{Duration, Instant};

/// Timer for a measured block
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since the timer started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return elapsed nanoseconds
    #[inline(always)]
    pub fn stop(self) -> u64 {
        duration_nanos(self.start.elapsed())
    }
}

/// Nanoseconds in `d`, saturating at `u64::MAX`
#[inline]
pub fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Pin the calling thread to one CPU core.
///
/// Keeps a case on one core for its whole lifetime so migrations do not show
/// up as timing noise.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    // CPU_SET indexes a fixed-size mask and aborts on out-of-range indices.
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cpu index {cpu} exceeds the affinity mask size"),
        ));
    }

    // SAFETY: cpu_set_t is a plain bitmask; a zeroed value is the empty set and
    // CPU_SET only writes within it. sched_setaffinity(0, ..) targets the
    // calling thread.
    let result = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };

    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// CPU pinning is only implemented on Linux; elsewhere this is a no-op.
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
