//! Structured record of a distributed run, consumed by writers and analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WorkerFailure;
use crate::sampling::{RunConfiguration, VariationalParameters};
use crate::statistics::{AggregatedResult, DriftStats};

/// One completed iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub run_id: u64,
    pub parameters: VariationalParameters,
    pub config: RunConfiguration,
    pub result: AggregatedResult,
    /// Drift statistics of every successful worker
    pub drift: BTreeMap<usize, DriftStats>,
    pub failures: Vec<WorkerFailure>,
}

impl IterationRecord {
    pub fn successful_workers(&self) -> usize {
        self.drift.len()
    }
}

/// An iteration whose statistics could not be used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscardedIteration {
    pub run_id: u64,
    pub reason: String,
    pub failures: Vec<WorkerFailure>,
}

/// Everything a distributed run produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub initial_config: RunConfiguration,
    pub initial_parameters: VariationalParameters,
    pub final_parameters: VariationalParameters,
    pub iterations: Vec<IterationRecord>,
    #[serde(default)]
    pub discarded: Vec<DiscardedIteration>,
}

impl SimulationRecord {
    pub fn new(config: RunConfiguration, parameters: VariationalParameters) -> Self {
        Self {
            initial_config: config,
            initial_parameters: parameters.clone(),
            final_parameters: parameters,
            iterations: Vec::new(),
            discarded: Vec::new(),
        }
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }
}
