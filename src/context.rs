//! Process-level context handed to every component.

use serde::{Deserialize, Serialize};

/// Identity of the current process within the fleet.
///
/// Created once at process start and passed down explicitly; nothing in the
/// crate reads fleet identity or options from global state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimContext {
    pub worker_id: usize,
    pub n_workers: usize,
    pub master_seed: u64,
}

impl SimContext {
    pub fn new(worker_id: usize, n_workers: usize, master_seed: u64) -> Self {
        Self { worker_id, n_workers, master_seed }
    }
}
