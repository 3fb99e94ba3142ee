//! Wavefunction module - trial orbitals for the determinantal wavefunction.

mod tight_binding;

pub use tight_binding::{tight_binding_hamiltonian, wf_tight_binding, SingleParticleOrbitals};
