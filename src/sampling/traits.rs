//! Capabilities the run controller drives.

use super::params::VariationalParameters;
use super::rng::WorkerRng;
use crate::error::Result;
use crate::statistics::Measurement;

/// A Monte Carlo model with incrementally updated state.
pub trait Model {
    type State;

    /// Build the initial walk state for a parameter set.
    ///
    /// Fails with `ModelUnstable` when the trial wavefunction is ill-defined.
    fn prepare(&self, params: &VariationalParameters, rng: &mut WorkerRng) -> Result<Self::State>;

    /// Perform one sweep using fast incremental updates.
    ///
    /// Returns an estimate of the accumulated numerical deviation of the
    /// incremental state, in the units of the run's drift target.
    fn step(&self, state: &mut Self::State, rng: &mut WorkerRng) -> f64;

    /// Discard the incremental state and rebuild it exactly.
    fn recompute_exact(&self, state: &mut Self::State) -> Result<()>;
}

/// One tracked quantity of a model state.
pub trait Observable<S> {
    /// Name under which the bin means are reported and aggregated.
    fn name(&self) -> &str;

    /// Measure the current state. Must not mutate it.
    fn measure(&self, state: &S) -> Measurement;
}
