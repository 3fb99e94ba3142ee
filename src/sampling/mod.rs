//! Sampling module - per-worker Monte Carlo run execution.

mod outcome;
mod params;
mod recompute;
mod rng;
mod simrun;
mod traits;

pub use outcome::{RunOutcome, RunStatus};
pub use params::{RunConfiguration, VariationalParameters};
pub use recompute::{FixedCadence, ReactiveToDrift, RecomputePolicy, RecomputeStrategy};
pub use rng::{worker_rng, WorkerRng};
pub use simrun::{RunController, RunPhase, UpdateMode};
pub use traits::{Model, Observable};
