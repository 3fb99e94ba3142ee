//! Terminal result of one worker's run.

use serde::{Deserialize, Serialize};

use crate::error::FailureReason;
use crate::statistics::{DriftStats, ObservableSeries};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RunStatus {
    Success {
        series: Vec<ObservableSeries>,
        drift: DriftStats,
    },
    Failed {
        reason: FailureReason,
    },
}

/// What a worker reports back to the master, exactly once per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: u64,
    pub worker_id: usize,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn success(
        run_id: u64,
        worker_id: usize,
        series: Vec<ObservableSeries>,
        drift: DriftStats,
    ) -> Self {
        Self { run_id, worker_id, status: RunStatus::Success { series, drift } }
    }

    pub fn failed(run_id: u64, worker_id: usize, reason: FailureReason) -> Self {
        Self { run_id, worker_id, status: RunStatus::Failed { reason } }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Success { .. })
    }

    /// Bin means of one observable, if the run succeeded and tracked it.
    pub fn series(&self, observable: &str) -> Option<&ObservableSeries> {
        match &self.status {
            RunStatus::Success { series, .. } => series.iter().find(|s| s.name == observable),
            RunStatus::Failed { .. } => None,
        }
    }
}
