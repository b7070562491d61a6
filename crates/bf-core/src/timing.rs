//! Lightweight performance timing for the transport backends.
//!
//! Counters are always collected (they are a couple of relaxed atomics per
//! call); printing is gated by `BF_TIMING` or [`enable_timing`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable timing output globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Disable timing output globally.
pub fn disable_timing() {
    ENABLED.store(false, Ordering::Relaxed);
}

/// Check if timing output is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("BF_TIMING").is_ok()
}

/// A simple timer that measures elapsed time.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the elapsed time into `sink`.
    pub fn stop_into(self, sink: &AccumulatingTimer) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64();
        sink.record(elapsed);
        elapsed
    }
}

/// Accumulating timer for tracking total time across multiple calls.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, duration_s: f64) {
        let nanos = (duration_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Transport backend timers.
pub mod kernel_timing {
    use super::AccumulatingTimer;

    /// CPU transport sweeps
    pub static CPU_SWEEPS: AccumulatingTimer = AccumulatingTimer::new();
    /// GPU transport sweeps, upload through download
    pub static GPU_SWEEPS: AccumulatingTimer = AccumulatingTimer::new();
    /// Host-to-device and device-to-host copies
    pub static GPU_TRANSFERS: AccumulatingTimer = AccumulatingTimer::new();

    pub fn reset_all() {
        CPU_SWEEPS.reset();
        GPU_SWEEPS.reset();
        GPU_TRANSFERS.reset();
    }

    /// One line per non-empty timer, `None` when timing output is disabled.
    pub fn summary() -> Option<String> {
        if !super::is_enabled() {
            return None;
        }
        let mut out = String::from("=== Transport kernel timing ===\n");
        for (label, timer) in [
            ("cpu sweeps", &CPU_SWEEPS),
            ("gpu sweeps", &GPU_SWEEPS),
            ("gpu transfers", &GPU_TRANSFERS),
        ] {
            if timer.count() > 0 {
                out.push_str(&format!(
                    "{label:<14} {} calls, {:.3}s total, {:.4}ms avg\n",
                    timer.count(),
                    timer.total_seconds(),
                    timer.average_seconds() * 1000.0
                ));
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_averages() {
        let timer = AccumulatingTimer::new();
        timer.record(0.5);
        timer.record(1.5);
        assert_eq!(timer.count(), 2);
        assert!((timer.total_seconds() - 2.0).abs() < 1e-6);
        assert!((timer.average_seconds() - 1.0).abs() < 1e-6);
        timer.reset();
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average_seconds(), 0.0);
    }
}
