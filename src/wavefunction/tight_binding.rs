//! Single particle orbitals from a tight-binding Hamiltonian.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lattice::Lattice;

/// Minimum gap between the highest occupied and lowest empty level.
const OPEN_SHELL_GAP: f64 = 1e-5;

/// Occupied orbitals of a closed-shell Slater determinant.
#[derive(Clone, Debug)]
pub struct SingleParticleOrbitals {
    /// `L x n` matrix, column `k` is orbital `k` in the site basis
    pub orbitals: DMatrix<f64>,
    /// All `L` single particle energies in ascending order
    pub energies: DVector<f64>,
}

impl SingleParticleOrbitals {
    /// Amplitude of orbital `k` on site `l`.
    #[inline]
    pub fn phi(&self, l: usize, k: usize) -> f64 {
        self.orbitals[(l, k)]
    }

    pub fn num_orbitals(&self) -> usize {
        self.orbitals.ncols()
    }

    /// Energy of the Slater determinant ground state per spin species.
    pub fn ground_state_energy(&self) -> f64 {
        self.energies.rows(0, self.num_orbitals()).sum()
    }
}

/// Tight-binding Hamiltonian `H = -Σ_X t_X Σ_{l, l' ∈ Xnn(l)} |l⟩⟨l'|`.
pub fn tight_binding_hamiltonian(t: &[f64], lattice: &dyn Lattice) -> DMatrix<f64> {
    let n = lattice.len();
    let mut h = DMatrix::zeros(n, n);
    for (x, &t_x) in t.iter().enumerate() {
        if t_x == 0.0 {
            continue;
        }
        for l in 0..n {
            for k in lattice.neighbors(l, x + 1) {
                h[(l, k)] -= t_x;
            }
        }
    }
    h
}

/// Diagonalize the tight-binding Hamiltonian and keep the lowest
/// `n_per_spin` orbitals.
///
/// Fails with [`Error::ModelUnstable`] if the Fermi level is degenerate
/// (open shell), since the trial determinant is then not unique.
pub fn wf_tight_binding(
    t: &[f64],
    n_per_spin: usize,
    lattice: &dyn Lattice,
) -> Result<SingleParticleOrbitals> {
    let l = lattice.len();
    if n_per_spin == 0 || n_per_spin > l {
        return Err(Error::InvalidConfig(format!(
            "cannot place {} particles per spin on {} sites",
            n_per_spin, l
        )));
    }

    let eigen = SymmetricEigen::new(tight_binding_hamiltonian(t, lattice));

    let mut order: Vec<usize> = (0..l).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    let energies = DVector::from_iterator(l, order.iter().map(|&i| eigen.eigenvalues[i]));

    if n_per_spin < l && energies[n_per_spin] - energies[n_per_spin - 1] < OPEN_SHELL_GAP {
        return Err(Error::ModelUnstable(format!(
            "open shell: E_fermi = {:.6}, orbital above = {:.6}",
            energies[n_per_spin - 1],
            energies[n_per_spin]
        )));
    }

    let mut orbitals = DMatrix::zeros(l, n_per_spin);
    for (k, &i) in order.iter().take(n_per_spin).enumerate() {
        orbitals.set_column(k, &eigen.eigenvectors.column(i));
    }

    debug!(
        sites = l,
        n_per_spin,
        e_fermi = energies[n_per_spin - 1],
        "tight-binding orbitals ready"
    );

    Ok(SingleParticleOrbitals { orbitals, energies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Chain1D, Square2D};
    use approx::assert_relative_eq;

    #[test]
    fn test_hamiltonian_is_symmetric() {
        let lat = Square2D::new(4);
        let h = tight_binding_hamiltonian(&[1.0, -0.3, 0.1], &lat);
        assert_relative_eq!((&h - h.transpose()).norm(), 0.0);
    }

    #[test]
    fn test_square_closed_shell_levels() {
        // 4x4 band: -4 (1x), -2 (4x), 0 (6x), 2 (4x), 4 (1x)
        let lat = Square2D::new(4);
        let spo = wf_tight_binding(&[1.0, 0.0, 0.0], 5, &lat).unwrap();
        assert_eq!(spo.num_orbitals(), 5);
        assert_relative_eq!(spo.energies[0], -4.0, epsilon = 1e-10);
        assert_relative_eq!(spo.energies[4], -2.0, epsilon = 1e-10);
        assert_relative_eq!(spo.energies[5], 0.0, epsilon = 1e-10);
        assert_relative_eq!(spo.ground_state_energy(), -12.0, epsilon = 1e-10);
    }

    #[test]
    fn test_orbitals_are_orthonormal() {
        let lat = Square2D::new(4);
        let spo = wf_tight_binding(&[1.0, 0.0, 0.0], 5, &lat).unwrap();
        let overlap = spo.orbitals.transpose() * &spo.orbitals;
        assert_relative_eq!((overlap - DMatrix::identity(5, 5)).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_open_shell_is_model_unstable() {
        let lat = Square2D::new(4);
        let err = wf_tight_binding(&[1.0, 0.0, 0.0], 4, &lat).unwrap_err();
        assert!(matches!(err, Error::ModelUnstable(_)));
    }

    #[test]
    fn test_chain_half_filling_odd_count() {
        // 6 site ring: -2, -1, -1, 1, 1, 2 -> 3 per spin is closed
        let lat = Chain1D::new(6);
        assert!(wf_tight_binding(&[1.0, 0.0, 0.0], 3, &lat).is_ok());
        assert!(wf_tight_binding(&[1.0, 0.0, 0.0], 2, &lat).is_err());
    }

    #[test]
    fn test_too_many_particles_rejected() {
        let lat = Chain1D::new(4);
        assert!(matches!(
            wf_tight_binding(&[1.0, 0.0, 0.0], 5, &lat),
            Err(Error::InvalidConfig(_))
        ));
    }
}
