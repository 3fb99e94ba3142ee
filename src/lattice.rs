//! Lattice geometry consumed by the trial wavefunction, the observables and
//! the structure factor analysis.

use std::f64::consts::PI;

use nalgebra::DVector;

/// Periodic lattice of `len()` sites.
pub trait Lattice: Send + Sync + std::fmt::Debug {
    /// Number of sites.
    fn len(&self) -> usize;

    /// Sites that are `x`-th nearest neighbours of `l` (x = 1, 2, 3).
    fn neighbors(&self, l: usize, x: usize) -> Vec<usize>;

    /// Minimum image displacement from site `i` to site `j`.
    fn r(&self, i: usize, j: usize) -> DVector<f64>;

    /// Momenta used for Fourier transforms on this lattice.
    fn qvectors(&self) -> Vec<DVector<f64>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn wrap(i: isize, n: usize) -> usize {
    i.rem_euclid(n as isize) as usize
}

/// Displacement `d` folded into `[-n/2, n/2]`.
fn min_image(d: isize, n: usize) -> f64 {
    let n = n as isize;
    let mut d = d.rem_euclid(n);
    if 2 * d > n {
        d -= n;
    }
    d as f64
}

fn finish(l: usize, mut sites: Vec<usize>) -> Vec<usize> {
    sites.sort_unstable();
    sites.dedup();
    sites.retain(|&s| s != l);
    sites
}

/// Periodic one-dimensional chain.
#[derive(Clone, Debug)]
pub struct Chain1D {
    length: usize,
}

impl Chain1D {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Lattice for Chain1D {
    fn len(&self) -> usize {
        self.length
    }

    fn neighbors(&self, l: usize, x: usize) -> Vec<usize> {
        let d = x as isize;
        let l_i = l as isize;
        finish(l, vec![wrap(l_i + d, self.length), wrap(l_i - d, self.length)])
    }

    fn r(&self, i: usize, j: usize) -> DVector<f64> {
        DVector::from_element(1, min_image(j as isize - i as isize, self.length))
    }

    fn qvectors(&self) -> Vec<DVector<f64>> {
        (0..self.length)
            .map(|m| DVector::from_element(1, 2.0 * PI * m as f64 / self.length as f64))
            .collect()
    }
}

/// Periodic square lattice with `side * side` sites, indexed `y * side + x`.
#[derive(Clone, Debug)]
pub struct Square2D {
    side: usize,
}

impl Square2D {
    pub fn new(side: usize) -> Self {
        Self { side }
    }

    fn site(&self, x: isize, y: isize) -> usize {
        wrap(y, self.side) * self.side + wrap(x, self.side)
    }

    fn coords(&self, l: usize) -> (isize, isize) {
        ((l % self.side) as isize, (l / self.side) as isize)
    }
}

impl Lattice for Square2D {
    fn len(&self) -> usize {
        self.side * self.side
    }

    fn neighbors(&self, l: usize, x: usize) -> Vec<usize> {
        let (cx, cy) = self.coords(l);
        let offsets: &[(isize, isize)] = match x {
            1 => &[(1, 0), (-1, 0), (0, 1), (0, -1)],
            2 => &[(1, 1), (1, -1), (-1, 1), (-1, -1)],
            3 => &[(2, 0), (-2, 0), (0, 2), (0, -2)],
            _ => &[],
        };
        finish(
            l,
            offsets.iter().map(|&(dx, dy)| self.site(cx + dx, cy + dy)).collect(),
        )
    }

    fn r(&self, i: usize, j: usize) -> DVector<f64> {
        let (xi, yi) = self.coords(i);
        let (xj, yj) = self.coords(j);
        DVector::from_vec(vec![
            min_image(xj - xi, self.side),
            min_image(yj - yi, self.side),
        ])
    }

    fn qvectors(&self) -> Vec<DVector<f64>> {
        let dq = 2.0 * PI / self.side as f64;
        let mut qs = Vec::with_capacity(self.len());
        for m in 0..self.side {
            for n in 0..self.side {
                qs.push(DVector::from_vec(vec![dq * m as f64, dq * n as f64]));
            }
        }
        qs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_neighbors_wrap() {
        let chain = Chain1D::new(6);
        assert_eq!(chain.neighbors(0, 1), vec![1, 5]);
        assert_eq!(chain.neighbors(0, 2), vec![2, 4]);
        assert_eq!(chain.neighbors(0, 3), vec![3]);
    }

    #[test]
    fn test_square_neighbors() {
        let lat = Square2D::new(4);
        assert_eq!(lat.len(), 16);
        // site 5 = (1, 1)
        assert_eq!(lat.neighbors(5, 1), vec![1, 4, 6, 9]);
        assert_eq!(lat.neighbors(5, 2), vec![0, 2, 8, 10]);
        assert_eq!(lat.neighbors(5, 3), vec![7, 13]);
        for l in 0..lat.len() {
            assert_eq!(lat.neighbors(l, 1).len(), 4);
        }
    }

    #[test]
    fn test_neighbor_relation_is_symmetric() {
        let lat = Square2D::new(4);
        for x in 1..=3 {
            for l in 0..lat.len() {
                for k in lat.neighbors(l, x) {
                    assert!(lat.neighbors(k, x).contains(&l));
                }
            }
        }
    }

    #[test]
    fn test_minimum_image_displacement() {
        let lat = Square2D::new(4);
        assert_eq!(lat.r(0, 3), DVector::from_vec(vec![-1.0, 0.0]));
        assert_eq!(lat.r(0, 5), DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(lat.r(5, 0), DVector::from_vec(vec![-1.0, -1.0]));
        assert_eq!(lat.qvectors().len(), 16);
    }
}
