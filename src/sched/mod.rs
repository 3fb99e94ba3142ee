//! Master/worker scheduling over a message-passing link.

mod master;
mod messages;
mod policy;
mod record;
mod transport;
mod worker;

pub use master::Scheduler;
pub use messages::{Request, RunRequest};
pub use policy::{
    ContinuationConfig, ContinuationPolicy, Decision, ErrorThreshold, ExternalOptimizer,
    FixedIterations,
};
pub use record::{DiscardedIteration, IterationRecord, SimulationRecord};
pub use transport::{channel_fleet, ChannelMaster, ChannelWorker, MasterLink, WorkerLink};
pub use worker::{run_worker, RunSetup};
