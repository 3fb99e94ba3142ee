//! Observables module - quantities measured on the Hubbard walk state.

mod density;
mod energy;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use density::{DensityCorrelation, DoubleOccupancy};
pub use energy::{Energy, HubbardHamiltonian};

use crate::lattice::Lattice;
use crate::sampling::Observable;
use crate::systems::HubbardState;

/// Observables selectable from the configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservableKind {
    Energy,
    DoubleOccupancy,
    DensityCorrelation,
}

impl ObservableKind {
    /// Name the observable reports its bins under.
    pub fn name(&self) -> &'static str {
        match self {
            ObservableKind::Energy => Energy::NAME,
            ObservableKind::DoubleOccupancy => DoubleOccupancy::NAME,
            ObservableKind::DensityCorrelation => DensityCorrelation::NAME,
        }
    }
}

/// Instantiate the requested observables for one run.
pub fn build_observables(
    kinds: &[ObservableKind],
    lattice: &Arc<dyn Lattice>,
    hamiltonian: &HubbardHamiltonian,
) -> Vec<Box<dyn Observable<HubbardState>>> {
    kinds
        .iter()
        .map(|kind| -> Box<dyn Observable<HubbardState>> {
            match kind {
                ObservableKind::Energy => Box::new(Energy::new(lattice.clone(), hamiltonian.clone())),
                ObservableKind::DoubleOccupancy => Box::new(DoubleOccupancy),
                ObservableKind::DensityCorrelation => Box::new(DensityCorrelation),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Chain1D;

    #[test]
    fn test_build_observables_keeps_order_and_names() {
        let lattice: Arc<dyn Lattice> = Arc::new(Chain1D::new(4));
        let kinds = [ObservableKind::DensityCorrelation, ObservableKind::Energy];
        let obs = build_observables(&kinds, &lattice, &HubbardHamiltonian::default());
        let names: Vec<&str> = obs.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["nncorr", "E"]);
        assert_eq!(kinds[1].name(), "E");
    }
}
