//! Post-processing of aggregated results.

use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::lattice::Lattice;

/// Static structure factor `N(q) = 2/L Σ_{l<k} cos(q·r_lk) ⟨n_l n_k⟩`.
///
/// `nncorr` is the flattened `L x L` density-density correlation.
pub fn static_structure_factor(
    lattice: &dyn Lattice,
    nncorr: &DVector<f64>,
) -> Result<Vec<(DVector<f64>, f64)>> {
    let l = lattice.len();
    if nncorr.len() != l * l {
        return Err(Error::InvalidConfig(format!(
            "density correlation has {} entries, lattice needs {}",
            nncorr.len(),
            l * l
        )));
    }

    let result = lattice
        .qvectors()
        .into_iter()
        .map(|q| {
            let mut sum = 0.0;
            for i in 0..l {
                for k in i + 1..l {
                    sum += q.dot(&lattice.r(i, k)).cos() * nncorr[i * l + k];
                }
            }
            (q, 2.0 / l as f64 * sum)
        })
        .collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Chain1D;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_density_peaks_at_zero_momentum() {
        let lat = Chain1D::new(4);
        let nn = DVector::from_element(16, 1.0);
        let sq = static_structure_factor(&lat, &nn).unwrap();
        assert_eq!(sq.len(), 4);
        // q = 0: 2/4 * 6 pairs
        assert_relative_eq!(sq[0].1, 3.0, epsilon = 1e-12);
        // q = π/2: only the two pairs at distance 2 contribute, cos(π) = -1
        assert_relative_eq!(sq[1].1, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_size_mismatch() {
        let lat = Chain1D::new(4);
        assert!(static_structure_factor(&lat, &DVector::zeros(4)).is_err());
    }
}
