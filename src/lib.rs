//! hvmc - distributed Variational Monte Carlo for Hubbard-type lattice models
//!
//! Workers sample Gutzwiller-projected Slater determinants with incremental
//! inverse updates, guarded by a drift monitor that decides when to rebuild
//! from scratch. Bin means flow back to a master that pools them across the
//! fleet and decides whether to run another iteration.

pub mod analysis;
pub mod context;
pub mod error;
pub mod io;
pub mod lattice;
pub mod observables;
pub mod sampling;
pub mod sched;
pub mod statistics;
pub mod systems;
pub mod wavefunction;

// Re-export commonly used types at crate root
pub use context::SimContext;
pub use error::{Error, FailureReason, Result, WorkerFailure};
pub use io::{read_config, write_record, SimulationConfig};
pub use lattice::{Chain1D, Lattice, Square2D};
pub use observables::{DensityCorrelation, DoubleOccupancy, Energy, HubbardHamiltonian, ObservableKind};
pub use sampling::{
    Model, Observable, RunConfiguration, RunController, RunOutcome, RunStatus,
    VariationalParameters,
};
pub use sched::{
    channel_fleet, run_worker, ContinuationConfig, ContinuationPolicy, Decision, MasterLink,
    Scheduler, SimulationRecord, WorkerLink,
};
pub use statistics::{
    AggregatedResult, BinAccumulator, DriftMonitor, DriftStats, Measurement, ObservableAggregator,
    ObservableSeries,
};
pub use systems::{HubbardModel, HubbardState};
