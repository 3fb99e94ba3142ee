//! Error types shared by the run controller, aggregator and scheduler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum Error {
    /// The trial wavefunction or the incremental model state is ill-defined
    /// for the current parameters.
    #[error("model unstable: {0}")]
    ModelUnstable(String),

    /// An aggregation was requested before enough bins existed.
    #[error("insufficient data for `{observable}`: {bins} bin(s), need at least 2")]
    InsufficientData { observable: String, bins: usize },

    #[error("worker {worker} did not report before the deadline")]
    WorkerUnresponsive { worker: usize },

    /// Every worker of an iteration failed; the whole run is aborted.
    #[error("all {} workers failed", failures.len())]
    AllWorkersFailed { failures: Vec<WorkerFailure> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An observable produced measurements of differing shape within one run.
    #[error("observable `{observable}` changed shape: {detail}")]
    InconsistentObservable { observable: String, detail: String },

    #[error("transport closed: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Why a single worker's run did not produce statistics.
///
/// This is the serializable counterpart of the per-run subset of [`Error`]
/// that crosses the master/worker boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    ModelUnstable(String),
    WorkerUnresponsive,
    InconsistentObservable(String),
    InvalidRequest(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::ModelUnstable(msg) => write!(f, "model unstable: {}", msg),
            FailureReason::WorkerUnresponsive => write!(f, "worker unresponsive"),
            FailureReason::InconsistentObservable(msg) => write!(f, "inconsistent observable: {}", msg),
            FailureReason::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
        }
    }
}

impl From<&Error> for FailureReason {
    fn from(err: &Error) -> Self {
        match err {
            Error::ModelUnstable(msg) => FailureReason::ModelUnstable(msg.clone()),
            Error::WorkerUnresponsive { .. } => FailureReason::WorkerUnresponsive,
            Error::InconsistentObservable { .. } => {
                FailureReason::InconsistentObservable(err.to_string())
            }
            other => FailureReason::InvalidRequest(other.to_string()),
        }
    }
}

/// A failure recorded against one worker in one iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub worker: usize,
    pub reason: FailureReason,
}
