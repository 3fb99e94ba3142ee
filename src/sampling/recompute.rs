//! When to throw away incremental state and recompute it exactly.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::statistics::DriftMonitor;

/// Strategy deciding whether the next sweep should start from an exact
/// recomputation.
pub trait RecomputePolicy: Send {
    fn should_recompute(&mut self, sweeps_since_recalc: usize, monitor: &DriftMonitor) -> bool;
}

/// Recompute every `every` sweeps regardless of the measured drift.
#[derive(Clone, Debug)]
pub struct FixedCadence {
    pub every: usize,
}

impl RecomputePolicy for FixedCadence {
    fn should_recompute(&mut self, sweeps_since_recalc: usize, _monitor: &DriftMonitor) -> bool {
        sweeps_since_recalc >= self.every
    }
}

/// Recompute after `max_misses` consecutive drift misses, and in any case
/// after `max_interval` sweeps when that is set.
#[derive(Clone, Debug)]
pub struct ReactiveToDrift {
    pub max_misses: usize,
    pub max_interval: Option<usize>,
}

impl RecomputePolicy for ReactiveToDrift {
    fn should_recompute(&mut self, sweeps_since_recalc: usize, monitor: &DriftMonitor) -> bool {
        if monitor.should_recompute() && monitor.consecutive_misses() >= self.max_misses {
            return true;
        }
        matches!(self.max_interval, Some(n) if sweeps_since_recalc >= n)
    }
}

/// Serializable selection of a [`RecomputePolicy`], broadcast with the run configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecomputeStrategy {
    FixedCadence {
        every: usize,
    },
    Reactive {
        max_misses: usize,
        #[serde(default)]
        max_interval: Option<usize>,
    },
}

impl Default for RecomputeStrategy {
    fn default() -> Self {
        RecomputeStrategy::Reactive { max_misses: 1, max_interval: Some(50) }
    }
}

impl RecomputeStrategy {
    pub fn validate(&self) -> Result<()> {
        match self {
            RecomputeStrategy::FixedCadence { every: 0 } => {
                Err(Error::InvalidConfig("recompute cadence must be at least 1".into()))
            }
            RecomputeStrategy::Reactive { max_misses: 0, .. } => {
                Err(Error::InvalidConfig("max_misses must be at least 1".into()))
            }
            RecomputeStrategy::Reactive { max_interval: Some(0), .. } => {
                Err(Error::InvalidConfig("max_interval must be at least 1".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn build(&self) -> Box<dyn RecomputePolicy> {
        match *self {
            RecomputeStrategy::FixedCadence { every } => Box::new(FixedCadence { every }),
            RecomputeStrategy::Reactive { max_misses, max_interval } => {
                Box::new(ReactiveToDrift { max_misses, max_interval })
            }
        }
    }
}
