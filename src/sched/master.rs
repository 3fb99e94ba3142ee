//! Master side of the distributed VMC loop.
//!
//! Every iteration is a barrier: one `RunRequest` goes out to the whole fleet
//! and the master waits for one `RunOutcome` per worker (or the deadline)
//! before aggregating. Outcomes carrying another run id are stale and dropped,
//! so statistics of different iterations never mix.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::messages::{Request, RunRequest};
use super::policy::{ContinuationPolicy, Decision, FixedIterations};
use super::record::{DiscardedIteration, IterationRecord, SimulationRecord};
use super::transport::MasterLink;
use crate::error::{Error, FailureReason, Result, WorkerFailure};
use crate::sampling::{RunConfiguration, RunOutcome, RunStatus, VariationalParameters};
use crate::statistics::{AggregatedResult, DriftStats, ObservableAggregator, ObservableSeries};

/// Drives iterations until the continuation policy says stop.
pub struct Scheduler {
    policy: Box<dyn ContinuationPolicy>,
    timeout: Duration,
    max_iterations: usize,
    observables: Vec<String>,
    next_run_id: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            policy: Box::new(FixedIterations { iterations: 1 }),
            timeout: Duration::from_secs(3600),
            max_iterations: 100,
            observables: Vec::new(),
            next_run_id: 0,
        }
    }
}

/// Outcomes gathered for one run id.
struct Gathered {
    series: BTreeMap<usize, Vec<ObservableSeries>>,
    drift: BTreeMap<usize, DriftStats>,
    failures: Vec<WorkerFailure>,
}

impl Scheduler {
    pub fn new(policy: Box<dyn ContinuationPolicy>) -> Self {
        Self { policy, ..Default::default() }
    }

    /// Fleet-wide deadline for one iteration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upper bound on broadcasts, counting retried iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Observables that must be present in every aggregated result.
    pub fn with_observables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observables = names.into_iter().map(Into::into).collect();
        self
    }

    /// Run the master loop to completion. Workers are always sent `Terminate`
    /// before this returns, whether it succeeds or aborts.
    pub fn run<L: MasterLink>(
        &mut self,
        link: &mut L,
        parameters: VariationalParameters,
        config: RunConfiguration,
    ) -> Result<SimulationRecord> {
        let result = self.iterate(link, parameters, config);
        let unreachable = link.broadcast(&Request::Terminate);
        if !unreachable.is_empty() {
            debug!(?unreachable, "workers already gone at termination");
        }
        result
    }

    fn iterate<L: MasterLink>(
        &mut self,
        link: &mut L,
        mut parameters: VariationalParameters,
        mut config: RunConfiguration,
    ) -> Result<SimulationRecord> {
        config.validate()?;
        let mut record = SimulationRecord::new(config.clone(), parameters.clone());

        for _ in 0..self.max_iterations {
            let run_id = self.next_run_id;
            self.next_run_id += 1;

            let request = RunRequest {
                run_id,
                parameters: parameters.clone(),
                config: config.clone(),
            };
            info!(
                run_id,
                iteration = record.iterations.len(),
                production_sweeps = config.production_sweeps,
                "broadcasting run"
            );
            let gathered = self.gather(link, &request);

            if gathered.drift.is_empty() {
                error!(run_id, "every worker failed, aborting");
                return Err(Error::AllWorkersFailed { failures: gathered.failures });
            }
            for failure in &gathered.failures {
                error!(run_id, worker = failure.worker, reason = %failure.reason, "worker failed");
            }

            let result = match self.aggregate(gathered.series) {
                Ok(result) => result,
                Err(Error::InsufficientData { observable, bins }) => {
                    let longer = lengthen(&config);
                    warn!(
                        run_id,
                        observable = %observable,
                        bins,
                        production_sweeps = longer.production_sweeps,
                        "not enough bins, retrying with a longer run"
                    );
                    record.discarded.push(DiscardedIteration {
                        run_id,
                        reason: format!("insufficient data for `{}`: {} bin(s)", observable, bins),
                        failures: gathered.failures,
                    });
                    config = longer;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let iteration = IterationRecord {
                iteration: record.iterations.len(),
                run_id,
                parameters: parameters.clone(),
                config: config.clone(),
                result,
                drift: gathered.drift,
                failures: gathered.failures,
            };
            log_result(&iteration.result, run_id);
            let decision = self.policy.decide(&iteration);
            record.iterations.push(iteration);

            match decision {
                Decision::Continue { parameters: p, config: c } => {
                    c.validate()?;
                    parameters = p;
                    config = c;
                }
                Decision::Stop => {
                    record.final_parameters = parameters;
                    return Ok(record);
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "iteration limit reached");
        record.final_parameters = parameters;
        Ok(record)
    }

    /// Broadcast `request` and wait for every worker's outcome of that run.
    fn gather<L: MasterLink>(&self, link: &mut L, request: &RunRequest) -> Gathered {
        let run_id = request.run_id;
        let n = link.n_workers();
        let mut reported = vec![false; n];
        let mut gathered = Gathered {
            series: BTreeMap::new(),
            drift: BTreeMap::new(),
            failures: Vec::new(),
        };

        for worker in link.broadcast(&Request::Run(request.clone())) {
            reported[worker] = true;
            gathered.failures.push(WorkerFailure {
                worker,
                reason: FailureReason::WorkerUnresponsive,
            });
        }

        let deadline = Instant::now() + self.timeout;
        while reported.iter().any(|r| !r) {
            let outcome = match link.recv_until(deadline) {
                Some(outcome) => outcome,
                None => break,
            };
            if !accept(&outcome, run_id, &reported) {
                continue;
            }
            reported[outcome.worker_id] = true;
            let RunOutcome { worker_id, status, .. } = outcome;
            match status {
                RunStatus::Success { series, drift } => {
                    gathered.series.insert(worker_id, series);
                    gathered.drift.insert(worker_id, drift);
                }
                RunStatus::Failed { reason } => {
                    gathered.failures.push(WorkerFailure { worker: worker_id, reason });
                }
            }
        }

        for (worker, _) in reported.iter().enumerate().filter(|(_, r)| !**r) {
            warn!(run_id, worker, "worker did not report before the deadline");
            gathered.failures.push(WorkerFailure {
                worker,
                reason: FailureReason::WorkerUnresponsive,
            });
        }
        gathered.failures.sort_by_key(|f| f.worker);
        gathered
    }

    fn aggregate(&self, series: BTreeMap<usize, Vec<ObservableSeries>>) -> Result<AggregatedResult> {
        let mut aggregator = ObservableAggregator::new(self.observables.iter().cloned());
        for (worker, worker_series) in series {
            for s in worker_series {
                aggregator.collect(worker, s);
            }
        }
        aggregator.finalize()
    }
}

fn accept(outcome: &RunOutcome, run_id: u64, reported: &[bool]) -> bool {
    if outcome.run_id != run_id {
        debug!(worker = outcome.worker_id, stale = outcome.run_id, run_id, "dropping stale outcome");
        return false;
    }
    match reported.get(outcome.worker_id) {
        None => {
            warn!(worker = outcome.worker_id, "outcome from unknown worker");
            false
        }
        Some(true) => {
            warn!(worker = outcome.worker_id, run_id, "duplicate outcome");
            false
        }
        Some(false) => true,
    }
}

/// Double the production phase, or start from one bin if it was empty.
fn lengthen(config: &RunConfiguration) -> RunConfiguration {
    let sweeps = if config.production_sweeps == 0 {
        config.bin_size * config.measurement_interval
    } else {
        config.production_sweeps * 2
    };
    config.clone().with_production_sweeps(sweeps)
}

fn log_result(result: &AggregatedResult, run_id: u64) {
    for (name, estimate) in &result.estimates {
        match (estimate.mean.as_scalar(), estimate.error.as_scalar()) {
            (Some(mean), Some(error)) => {
                info!(run_id, observable = %name, mean, error, bins = estimate.bins, "estimate")
            }
            _ => debug!(run_id, observable = %name, bins = estimate.bins, "vector estimate"),
        }
    }
}
