//! Messages crossing the master/worker boundary.
//!
//! All messages are serde-serializable so the same protocol can run over
//! in-process channels or an encoded byte stream.

use serde::{Deserialize, Serialize};

use crate::sampling::{RunConfiguration, VariationalParameters};

/// Parameters and run settings for one iteration, identical for every worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub run_id: u64,
    pub parameters: VariationalParameters,
    pub config: RunConfiguration,
}

/// Master to worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Run(RunRequest),
    Terminate,
}
