//! Density based observables.

use nalgebra::DVector;

use crate::sampling::Observable;
use crate::statistics::Measurement;
use crate::systems::HubbardState;

/// Fraction of doubly occupied sites.
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleOccupancy;

impl DoubleOccupancy {
    pub const NAME: &'static str = "docc";
}

impl Observable<HubbardState> for DoubleOccupancy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn measure(&self, state: &HubbardState) -> Measurement {
        Measurement::Scalar(state.double_occupancy() as f64 / state.num_sites() as f64)
    }
}

/// Density-density correlation `⟨n_l n_k⟩`, flattened row-major to `L * L`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DensityCorrelation;

impl DensityCorrelation {
    pub const NAME: &'static str = "nncorr";
}

impl Observable<HubbardState> for DensityCorrelation {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn measure(&self, state: &HubbardState) -> Measurement {
        let n = state.num_sites();
        let density: Vec<f64> = (0..n).map(|l| state.site_density(l) as f64).collect();
        Measurement::Vector(DVector::from_fn(n * n, |i, _| density[i / n] * density[i % n]))
    }
}
