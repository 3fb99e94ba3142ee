//! Floating point drift control.
//!
//! Incrementally updated quantities (e.g. inverse Slater matrices) slowly
//! lose precision. The [`DriftMonitor`] classifies measured deviations
//! against a target tolerance so the run controller can decide when the
//! incremental state must be thrown away and recomputed from scratch.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Deviation counters for one worker and one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftStats {
    /// The desired deviation
    pub target: f64,
    /// Number of full recalculations
    pub recalcs: u64,
    /// Deviations above target
    pub misses: u64,
    /// Deviations at or below target
    pub hits: u64,
    /// Misses by more than an order of magnitude
    pub mag1_misses: u64,
    /// Hits better than an order of magnitude
    pub mag1_hits: u64,
}

impl DriftStats {
    pub fn new(target: f64) -> Self {
        Self { target, ..Self::default() }
    }

    /// Number of classified deviations.
    pub fn samples(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of deviations that met the target.
    pub fn hit_rate(&self) -> f64 {
        match self.samples() {
            0 => 1.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

/// Bookkeeping for measured drift. Never blocks, never fails.
#[derive(Clone, Debug)]
pub struct DriftMonitor {
    stats: DriftStats,
    consecutive_misses: usize,
}

impl DriftMonitor {
    pub fn new(target: f64) -> Self {
        Self {
            stats: DriftStats::new(target),
            consecutive_misses: 0,
        }
    }

    /// Classify one measured deviation.
    pub fn add(&mut self, deviation: f64) {
        let target = self.stats.target;

        // NaN compares false everywhere and must land in the miss bucket
        if deviation <= target {
            self.stats.hits += 1;
            if deviation <= target / 10.0 {
                self.stats.mag1_hits += 1;
            }
            self.consecutive_misses = 0;
        } else {
            self.stats.misses += 1;
            if !(deviation <= target * 10.0) {
                self.stats.mag1_misses += 1;
            }
            self.consecutive_misses += 1;
        }
    }

    /// Note that the caller just performed a full recomputation.
    pub fn record_recalc(&mut self) {
        self.stats.recalcs += 1;
        self.consecutive_misses = 0;
    }

    /// True if the latest deviation since the last recomputation missed the target.
    pub fn should_recompute(&self) -> bool {
        self.consecutive_misses > 0
    }

    /// Misses in a row since the last hit or recomputation.
    pub fn consecutive_misses(&self) -> usize {
        self.consecutive_misses
    }

    pub fn snapshot(&self) -> DriftStats {
        self.stats
    }
}

/// Relative deviation `‖approx - exact‖ / ‖exact‖` in the Frobenius norm.
pub fn calc_deviation(approx: &DMatrix<f64>, exact: &DMatrix<f64>) -> f64 {
    let norm = exact.norm();
    if norm == 0.0 {
        return (approx - exact).norm();
    }
    (approx - exact).norm() / norm
}
