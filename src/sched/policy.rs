//! What the master does after an iteration has been aggregated.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::record::IterationRecord;
use crate::error::{Error, Result};
use crate::sampling::{RunConfiguration, VariationalParameters};
use crate::statistics::{AggregatedResult, Measurement};

/// Outcome of a continuation check.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Continue {
        parameters: VariationalParameters,
        config: RunConfiguration,
    },
    Stop,
}

/// Decides whether and how the simulation continues.
pub trait ContinuationPolicy: Send {
    fn decide(&mut self, iteration: &IterationRecord) -> Decision;
}

/// Run a fixed number of iterations with unchanged inputs.
#[derive(Clone, Debug)]
pub struct FixedIterations {
    pub iterations: usize,
}

impl ContinuationPolicy for FixedIterations {
    fn decide(&mut self, it: &IterationRecord) -> Decision {
        if it.iteration + 1 >= self.iterations {
            return Decision::Stop;
        }
        Decision::Continue {
            parameters: it.parameters.clone(),
            config: it.config.clone(),
        }
    }
}

/// Lengthen the production phase until the standard error of one observable
/// drops below `target_error`.
#[derive(Clone, Debug)]
pub struct ErrorThreshold {
    pub observable: String,
    pub target_error: f64,
    pub growth: f64,
    pub max_production_sweeps: usize,
}

fn largest(m: &Measurement) -> f64 {
    match m {
        Measurement::Scalar(x) => *x,
        Measurement::Vector(v) => v.iter().cloned().fold(0.0, f64::max),
    }
}

impl ContinuationPolicy for ErrorThreshold {
    fn decide(&mut self, it: &IterationRecord) -> Decision {
        let error = match it.result.get(&self.observable) {
            Some(est) => largest(&est.error),
            None => {
                warn!(observable = %self.observable, "observable not aggregated, stopping");
                return Decision::Stop;
            }
        };
        if error <= self.target_error {
            info!(observable = %self.observable, error, target = self.target_error, "converged");
            return Decision::Stop;
        }

        let current = it.config.production_sweeps;
        let next = ((current as f64 * self.growth).ceil() as usize).max(current + 1);
        if next > self.max_production_sweeps {
            warn!(
                observable = %self.observable,
                error,
                production_sweeps = current,
                "run length limit reached before convergence"
            );
            return Decision::Stop;
        }
        Decision::Continue {
            parameters: it.parameters.clone(),
            config: it.config.clone().with_production_sweeps(next),
        }
    }
}

/// Hand each result to an external optimizer; `None` from the optimizer stops.
pub struct ExternalOptimizer<F> {
    update: F,
}

impl<F> ExternalOptimizer<F>
where
    F: FnMut(&VariationalParameters, &AggregatedResult) -> Option<VariationalParameters> + Send,
{
    pub fn new(update: F) -> Self {
        Self { update }
    }
}

impl<F> ContinuationPolicy for ExternalOptimizer<F>
where
    F: FnMut(&VariationalParameters, &AggregatedResult) -> Option<VariationalParameters> + Send,
{
    fn decide(&mut self, it: &IterationRecord) -> Decision {
        match (self.update)(&it.parameters, &it.result) {
            Some(parameters) => Decision::Continue { parameters, config: it.config.clone() },
            None => Decision::Stop,
        }
    }
}

/// Serializable selection of the built-in policies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContinuationConfig {
    FixedIterations {
        iterations: usize,
    },
    ErrorThreshold {
        observable: String,
        target_error: f64,
        #[serde(default = "default_growth")]
        growth: f64,
        max_production_sweeps: usize,
    },
}

fn default_growth() -> f64 {
    2.0
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        ContinuationConfig::FixedIterations { iterations: 1 }
    }
}

impl ContinuationConfig {
    pub fn build(&self) -> Result<Box<dyn ContinuationPolicy>> {
        match self {
            ContinuationConfig::FixedIterations { iterations: 0 } => {
                Err(Error::InvalidConfig("iterations must be at least 1".into()))
            }
            ContinuationConfig::FixedIterations { iterations } => {
                Ok(Box::new(FixedIterations { iterations: *iterations }))
            }
            ContinuationConfig::ErrorThreshold { growth, .. } if !(*growth > 1.0) => {
                Err(Error::InvalidConfig(format!("growth must exceed 1, got {}", growth)))
            }
            ContinuationConfig::ErrorThreshold {
                observable,
                target_error,
                growth,
                max_production_sweeps,
            } => Ok(Box::new(ErrorThreshold {
                observable: observable.clone(),
                target_error: *target_error,
                growth: *growth,
                max_production_sweeps: *max_production_sweeps,
            })),
        }
    }
}
