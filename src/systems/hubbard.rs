//! Hubbard model sampled with a Gutzwiller-projected Slater determinant.
//!
//! The trial wavefunction is `Ψ = exp(-g·D) · det(D↑) · det(D↓)` where `D`
//! counts doubly occupied sites and `D↑`, `D↓` hold the tight-binding
//! orbitals evaluated at the electron positions. The inverse Slater matrices
//! are updated incrementally after every accepted hop; drift in those
//! inverses is what the run controller monitors.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::trace;

use crate::error::{Error, Result};
use crate::lattice::Lattice;
use crate::sampling::{Model, VariationalParameters, WorkerRng};
use crate::statistics::calc_deviation;
use crate::wavefunction::{wf_tight_binding, SingleParticleOrbitals};

/// Variational parameters: three hoppings of the trial band plus Gutzwiller `g`.
pub const NUM_PARAMS: usize = 4;

/// Attempts at finding a non-singular initial configuration.
const MAX_INIT_ATTEMPTS: usize = 100;

/// Smallest acceptable |det| of an initial Slater matrix.
const SINGULAR_DET: f64 = 1e-10;

/// Largest residual `max|D·W - I|` tolerated for an exact inverse.
const EXACT_RESIDUAL: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spin {
    Up = 0,
    Down = 1,
}

impl Spin {
    pub const BOTH: [Spin; 2] = [Spin::Up, Spin::Down];

    fn flip(self) -> Spin {
        match self {
            Spin::Up => Spin::Down,
            Spin::Down => Spin::Up,
        }
    }
}

/// Electrons of one spin species and their Slater matrix.
#[derive(Clone, Debug)]
struct SpinSector {
    /// electron -> site
    pos: Vec<usize>,
    /// site -> electron
    site_electron: Vec<Option<usize>>,
    /// `d[(e, k)] = φ_k(pos[e])`
    d: DMatrix<f64>,
    /// incrementally updated inverse of `d`
    w: DMatrix<f64>,
}

impl SpinSector {
    fn new(pos: Vec<usize>, spo: &SingleParticleOrbitals, sites: usize) -> Self {
        let n = pos.len();
        let mut site_electron = vec![None; sites];
        for (e, &l) in pos.iter().enumerate() {
            site_electron[l] = Some(e);
        }
        let d = DMatrix::from_fn(n, n, |e, k| spo.phi(pos[e], k));
        Self { pos, site_electron, d, w: DMatrix::zeros(n, n) }
    }

    fn orbital_row(spo: &SingleParticleOrbitals, site: usize) -> DVector<f64> {
        DVector::from_fn(spo.num_orbitals(), |k, _| spo.phi(site, k))
    }

    /// det ratio for moving electron `e` to `site`.
    fn det_ratio(&self, spo: &SingleParticleOrbitals, e: usize, site: usize) -> f64 {
        (0..spo.num_orbitals()).map(|k| spo.phi(site, k) * self.w[(k, e)]).sum()
    }

    /// Accept a move of electron `e` to `site` with determinant ratio `r`.
    fn apply_move(&mut self, spo: &SingleParticleOrbitals, e: usize, site: usize, r: f64) {
        let v = Self::orbital_row(spo, site);
        let u = self.w.tr_mul(&v);
        let col_e = self.w.column(e).clone_owned();
        for j in 0..u.len() {
            let delta = if j == e { 1.0 } else { 0.0 };
            let f = (u[j] - delta) / r;
            if f != 0.0 {
                self.w.column_mut(j).axpy(-f, &col_e, 1.0);
            }
        }

        self.d.set_row(e, &v.transpose());
        self.site_electron[self.pos[e]] = None;
        self.site_electron[site] = Some(e);
        self.pos[e] = site;
    }

    /// Exact inverse of `d`, cross-checked against its own residual.
    fn exact_inverse(&self) -> Result<DMatrix<f64>> {
        let n = self.d.nrows();
        let w = self
            .d
            .clone()
            .try_inverse()
            .ok_or_else(|| Error::ModelUnstable("Slater matrix is singular".into()))?;
        let residual = (&self.d * &w - DMatrix::identity(n, n)).amax();
        if !(residual <= EXACT_RESIDUAL) {
            return Err(Error::ModelUnstable(format!(
                "exact inverse inconsistent, residual {:.3e}",
                residual
            )));
        }
        Ok(w)
    }

    /// Cheap drift estimate: max-norm residual of row `r` of `D·W - I`.
    fn row_residual(&self, r: usize) -> f64 {
        let row = self.d.row(r) * &self.w;
        row.iter()
            .enumerate()
            .map(|(j, &x)| (x - if j == r { 1.0 } else { 0.0 }).abs())
            .fold(0.0, f64::max)
    }
}

/// Walk state of one Hubbard run.
#[derive(Clone, Debug)]
pub struct HubbardState {
    spo: SingleParticleOrbitals,
    g: f64,
    sectors: [SpinSector; 2],
    accepted: u64,
    proposed: u64,
}

impl HubbardState {
    fn sector(&self, spin: Spin) -> &SpinSector {
        &self.sectors[spin as usize]
    }

    pub fn num_sites(&self) -> usize {
        self.sectors[0].site_electron.len()
    }

    /// Sites occupied by electrons of one spin, indexed by electron.
    pub fn positions(&self, spin: Spin) -> &[usize] {
        &self.sector(spin).pos
    }

    pub fn is_occupied(&self, spin: Spin, site: usize) -> bool {
        self.sector(spin).site_electron[site].is_some()
    }

    /// Electron count on a site (0, 1 or 2).
    pub fn site_density(&self, site: usize) -> u8 {
        Spin::BOTH.iter().filter(|&&s| self.is_occupied(s, site)).count() as u8
    }

    pub fn double_occupancy(&self) -> usize {
        self.sector(Spin::Up)
            .pos
            .iter()
            .filter(|&&l| self.is_occupied(Spin::Down, l))
            .count()
    }

    fn gutzwiller_ratio(&self, spin: Spin, from: usize, to: usize) -> f64 {
        let other = spin.flip();
        let dd = self.is_occupied(other, to) as i32 - self.is_occupied(other, from) as i32;
        (-self.g * dd as f64).exp()
    }

    /// Wavefunction ratio `Ψ(x')/Ψ(x)` for hopping electron `e` of `spin` to `site`.
    ///
    /// Zero if the target site already holds an electron of the same spin.
    pub fn hop_ratio(&self, spin: Spin, e: usize, site: usize) -> f64 {
        let sector = self.sector(spin);
        if sector.site_electron[site].is_some() {
            return 0.0;
        }
        sector.det_ratio(&self.spo, e, site) * self.gutzwiller_ratio(spin, sector.pos[e], site)
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.proposed as f64
    }

    /// Relative deviation of the incremental inverses from the exact ones.
    pub fn inverse_deviation(&self) -> Result<f64> {
        let mut worst: f64 = 0.0;
        for sector in self.sectors.iter() {
            worst = worst.max(calc_deviation(&sector.w, &sector.exact_inverse()?));
        }
        Ok(worst)
    }
}

/// Hubbard model on a lattice at fixed particle number with `S_z = 0`.
#[derive(Clone, Debug)]
pub struct HubbardModel {
    lattice: Arc<dyn Lattice>,
    n_per_spin: usize,
}

impl HubbardModel {
    /// `electrons` must be even and fit on the lattice.
    pub fn new(lattice: Arc<dyn Lattice>, electrons: usize) -> Result<Self> {
        if electrons == 0 || electrons % 2 != 0 || electrons > 2 * lattice.len() {
            return Err(Error::InvalidConfig(format!(
                "need an even, positive electron count of at most {}, got {}",
                2 * lattice.len(),
                electrons
            )));
        }
        Ok(Self { lattice, n_per_spin: electrons / 2 })
    }

    pub fn lattice(&self) -> &Arc<dyn Lattice> {
        &self.lattice
    }

    pub fn electrons(&self) -> usize {
        2 * self.n_per_spin
    }

    fn random_sector(
        &self,
        spo: &SingleParticleOrbitals,
        rng: &mut WorkerRng,
    ) -> Option<SpinSector> {
        let sites = self.lattice.len();
        for _ in 0..MAX_INIT_ATTEMPTS {
            let pos = index::sample(rng, sites, self.n_per_spin).into_vec();
            let mut sector = SpinSector::new(pos, spo, sites);
            if sector.d.determinant().abs() < SINGULAR_DET {
                continue;
            }
            if let Ok(w) = sector.exact_inverse() {
                sector.w = w;
                return Some(sector);
            }
        }
        None
    }

    fn propose(&self, state: &mut HubbardState, spin: Spin, rng: &mut WorkerRng) {
        state.proposed += 1;
        let e = Uniform::new(0, self.n_per_spin).sample(rng);
        let from = state.sector(spin).pos[e];
        let neighbors = self.lattice.neighbors(from, 1);
        let to = match neighbors.choose(rng) {
            Some(&to) => to,
            None => return,
        };
        if state.is_occupied(spin, to) {
            return;
        }

        let r_det = state.sector(spin).det_ratio(&state.spo, e, to);
        let ratio = r_det * state.gutzwiller_ratio(spin, from, to);
        if rng.gen::<f64>() < ratio * ratio {
            let spo = &state.spo;
            state.sectors[spin as usize].apply_move(spo, e, to, r_det);
            state.accepted += 1;
        }
    }
}

impl Model for HubbardModel {
    type State = HubbardState;

    fn prepare(&self, params: &VariationalParameters, rng: &mut WorkerRng) -> Result<HubbardState> {
        if params.len() != NUM_PARAMS {
            return Err(Error::InvalidConfig(format!(
                "expected {} variational parameters (t1, t2, t3, g), got {}",
                NUM_PARAMS,
                params.len()
            )));
        }
        let p = params.as_slice();
        let spo = wf_tight_binding(&p[..3], self.n_per_spin, self.lattice.as_ref())?;

        let up = self.random_sector(&spo, rng);
        let down = self.random_sector(&spo, rng);
        let sectors = match (up, down) {
            (Some(up), Some(down)) => [up, down],
            _ => {
                return Err(Error::ModelUnstable(format!(
                    "no non-singular initial configuration after {} attempts",
                    MAX_INIT_ATTEMPTS
                )))
            }
        };

        Ok(HubbardState { spo, g: p[3], sectors, accepted: 0, proposed: 0 })
    }

    fn step(&self, state: &mut HubbardState, rng: &mut WorkerRng) -> f64 {
        for _ in 0..self.electrons() {
            let spin = if rng.gen::<bool>() { Spin::Up } else { Spin::Down };
            self.propose(state, spin, rng);
        }

        let spin = if rng.gen::<bool>() { Spin::Up } else { Spin::Down };
        let row = rng.gen_range(0..self.n_per_spin);
        state.sector(spin).row_residual(row)
    }

    fn recompute_exact(&self, state: &mut HubbardState) -> Result<()> {
        let spo = &state.spo;
        for sector in state.sectors.iter_mut() {
            let pos = &sector.pos;
            sector.d = DMatrix::from_fn(pos.len(), pos.len(), |e, k| spo.phi(pos[e], k));
            sector.w = sector.exact_inverse()?;
        }
        trace!(acceptance = state.acceptance_rate(), "slater inverses recomputed");
        Ok(())
    }
}
