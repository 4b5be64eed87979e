//! Timing and counters for the per-push recompute cycle

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Running counters kept by a stream processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMetrics {
    /// Samples accepted into the window
    pub accepted: u64,
    /// Samples rejected at validation
    pub rejected: u64,
    pub recomputations: u64,
    /// Duration of the most recent recompute in microseconds
    pub last_recompute_us: u64,
    pub total_recompute_us: u64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing a recompute cycle
    pub fn start_timing() -> ProcessingTimer {
        ProcessingTimer {
            start_time: Instant::now(),
        }
    }

    pub fn record_recompute(&mut self, elapsed_us: u64) {
        self.recomputations += 1;
        self.last_recompute_us = elapsed_us;
        self.total_recompute_us = self.total_recompute_us.saturating_add(elapsed_us);
    }

    pub fn average_recompute_us(&self) -> f64 {
        if self.recomputations == 0 {
            0.0
        } else {
            self.total_recompute_us as f64 / self.recomputations as f64
        }
    }

    /// Fraction of pushes that were rejected
    pub fn rejection_rate(&self) -> f64 {
        let total = self.accepted + self.rejected;
        if total == 0 {
            0.0
        } else {
            self.rejected as f64 / total as f64
        }
    }
}

/// Helper for timing processing operations
pub struct ProcessingTimer {
    start_time: Instant,
}

impl ProcessingTimer {
    /// Finish timing and return elapsed microseconds
    pub fn finish(self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }
}
