//! Local energy of the Hubbard Hamiltonian.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::sampling::Observable;
use crate::statistics::Measurement;
use crate::systems::{HubbardState, Spin};

/// `H = -Σ_X t_X Σ_{⟨ij⟩_X, σ} c†_iσ c_jσ + U Σ_i n_i↑ n_i↓`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HubbardHamiltonian {
    /// Hopping to 1st, 2nd and 3rd nearest neighbours
    pub t: [f64; 3],
    /// On-site repulsion
    pub u: f64,
}

impl Default for HubbardHamiltonian {
    fn default() -> Self {
        Self { t: [1.0, 0.0, 0.0], u: 4.0 }
    }
}

/// Local energy per site, `E_l = Σ_x' H_xx' Ψ(x')/Ψ(x) / L`.
#[derive(Clone, Debug)]
pub struct Energy {
    lattice: Arc<dyn Lattice>,
    hamiltonian: HubbardHamiltonian,
}

impl Energy {
    pub const NAME: &'static str = "E";

    pub fn new(lattice: Arc<dyn Lattice>, hamiltonian: HubbardHamiltonian) -> Self {
        Self { lattice, hamiltonian }
    }

    fn kinetic(&self, state: &HubbardState) -> f64 {
        let mut e_kin = 0.0;
        for spin in Spin::BOTH {
            for (e, &l) in state.positions(spin).iter().enumerate() {
                for (x, &t_x) in self.hamiltonian.t.iter().enumerate() {
                    if t_x == 0.0 {
                        continue;
                    }
                    for k in self.lattice.neighbors(l, x + 1) {
                        e_kin -= t_x * state.hop_ratio(spin, e, k);
                    }
                }
            }
        }
        e_kin
    }
}

impl Observable<HubbardState> for Energy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn measure(&self, state: &HubbardState) -> Measurement {
        let e_pot = self.hamiltonian.u * state.double_occupancy() as f64;
        Measurement::Scalar((self.kinetic(state) + e_pot) / self.lattice.len() as f64)
    }
}
