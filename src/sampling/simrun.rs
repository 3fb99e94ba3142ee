//! Execution of one Monte Carlo run on one worker.
//!
//! A run goes through `Equilibrating -> Producing -> Finalizing -> Done`,
//! or ends in `Failed` from any phase. Within a phase every sweep is either
//! an incremental update or, when the recompute policy asks for it, an exact
//! rebuild of the model state.

use tracing::{debug, info, trace, warn};

use super::outcome::RunOutcome;
use super::params::{RunConfiguration, VariationalParameters};
use super::recompute::RecomputePolicy;
use super::rng::{worker_rng, WorkerRng};
use super::traits::{Model, Observable};
use crate::context::SimContext;
use crate::error::{Error, FailureReason, Result};
use crate::statistics::{
    BinAccumulator, DriftMonitor, DriftStats, Measurement, ObservableSeries, Shape,
};

/// Phase of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Equilibrating,
    Producing,
    Finalizing,
    Done,
    Failed,
}

/// How the next sweep treats the model state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    Incremental { since_recalc: usize },
    Recomputing,
}

/// Drift bookkeeping of one walk.
struct Walk {
    monitor: DriftMonitor,
    policy: Box<dyn RecomputePolicy>,
    mode: UpdateMode,
}

impl Walk {
    fn new(config: &RunConfiguration) -> Self {
        Self {
            monitor: DriftMonitor::new(config.drift_target),
            policy: config.recompute.build(),
            mode: UpdateMode::Incremental { since_recalc: 0 },
        }
    }

    fn sweep<M: Model>(&mut self, model: &M, state: &mut M::State, rng: &mut WorkerRng) -> Result<()> {
        let since_recalc = match self.mode {
            UpdateMode::Incremental { since_recalc } => since_recalc,
            UpdateMode::Recomputing => 0,
        };

        let deviation = model.step(state, rng);
        self.monitor.add(deviation);

        if !deviation.is_finite() || self.policy.should_recompute(since_recalc + 1, &self.monitor) {
            self.mode = UpdateMode::Recomputing;
            trace!(deviation, since_recalc = since_recalc + 1, "recomputing model state");
            model.recompute_exact(state)?;
            self.monitor.record_recalc();
            self.mode = UpdateMode::Incremental { since_recalc: 0 };
        } else {
            self.mode = UpdateMode::Incremental { since_recalc: since_recalc + 1 };
        }
        Ok(())
    }
}

/// Drives runs for one worker.
pub struct RunController {
    ctx: SimContext,
    phase: RunPhase,
}

impl RunController {
    pub fn new(ctx: SimContext) -> Self {
        Self { ctx, phase: RunPhase::Idle }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(worker = self.ctx.worker_id, from = ?self.phase, to = ?phase, "run phase");
        self.phase = phase;
    }

    /// Execute one full run. Failures are reported in the outcome, never panicked.
    pub fn execute<M: Model>(
        &mut self,
        run_id: u64,
        config: &RunConfiguration,
        params: &VariationalParameters,
        model: &M,
        observables: &[Box<dyn Observable<M::State>>],
    ) -> RunOutcome {
        let worker = self.ctx.worker_id;
        match self.run(run_id, config, params, model, observables) {
            Ok((series, drift)) => {
                self.enter(RunPhase::Done);
                info!(
                    worker,
                    run_id,
                    bins = series.first().map(ObservableSeries::len).unwrap_or(0),
                    recalcs = drift.recalcs,
                    hit_rate = drift.hit_rate(),
                    "run complete"
                );
                RunOutcome::success(run_id, worker, series, drift)
            }
            Err(err) => {
                self.enter(RunPhase::Failed);
                warn!(worker, run_id, error = %err, "run failed");
                RunOutcome::failed(run_id, worker, FailureReason::from(&err))
            }
        }
    }

    fn run<M: Model>(
        &mut self,
        run_id: u64,
        config: &RunConfiguration,
        params: &VariationalParameters,
        model: &M,
        observables: &[Box<dyn Observable<M::State>>],
    ) -> Result<(Vec<ObservableSeries>, DriftStats)> {
        config.validate()?;
        let mut rng = worker_rng(self.ctx.master_seed, run_id, self.ctx.worker_id);
        let mut walk = Walk::new(config);

        self.enter(RunPhase::Equilibrating);
        let mut state = model.prepare(params, &mut rng)?;
        for _ in 0..config.equilibration_sweeps {
            walk.sweep(model, &mut state, &mut rng)?;
        }

        self.enter(RunPhase::Producing);
        let mut bins: Vec<BinAccumulator<Measurement>> =
            observables.iter().map(|_| BinAccumulator::new(config.bin_size)).collect();
        let mut series: Vec<ObservableSeries> =
            observables.iter().map(|o| ObservableSeries::new(o.name())).collect();
        let mut shapes: Vec<Option<Shape>> = vec![None; observables.len()];

        for sweep in 0..config.production_sweeps {
            walk.sweep(model, &mut state, &mut rng)?;

            if (sweep + 1) % config.measurement_interval != 0 {
                continue;
            }
            for (((obs, acc), out), shape) in observables
                .iter()
                .zip(bins.iter_mut())
                .zip(series.iter_mut())
                .zip(shapes.iter_mut())
            {
                let value = obs.measure(&state);
                let expected = *shape.get_or_insert(value.shape());
                if value.shape() != expected {
                    return Err(Error::InconsistentObservable {
                        observable: obs.name().to_string(),
                        detail: format!("{:?} after {:?}", value.shape(), expected),
                    });
                }
                if let Some(mean) = acc.push(value) {
                    out.bin_means.push(mean);
                }
            }
        }

        self.enter(RunPhase::Finalizing);
        for (acc, out) in bins.iter_mut().zip(series.iter()) {
            let dropped = acc.discard_partial();
            if dropped > 0 {
                debug!(observable = %out.name, dropped, "discarded incomplete trailing bin");
            }
        }

        Ok((series, walk.monitor.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;
    use crate::sampling::outcome::RunStatus;
    use crate::sampling::recompute::RecomputeStrategy;
    use approx::assert_relative_eq;
    use rand::Rng;

    /// Counts sweeps; deviation grows linearly until recomputed.
    struct ToyModel {
        drift_per_sweep: f64,
        fail_on_recompute: bool,
    }

    struct ToyState {
        sweeps: usize,
        drift: f64,
        noise: f64,
    }

    impl Model for ToyModel {
        type State = ToyState;

        fn prepare(&self, params: &VariationalParameters, _rng: &mut WorkerRng) -> Result<ToyState> {
            if params.get(0) == Some(-1.0) {
                return Err(Error::ModelUnstable("degenerate".into()));
            }
            Ok(ToyState { sweeps: 0, drift: 0.0, noise: 0.0 })
        }

        fn step(&self, state: &mut ToyState, rng: &mut WorkerRng) -> f64 {
            state.sweeps += 1;
            state.drift += self.drift_per_sweep;
            state.noise = rng.gen();
            state.drift
        }

        fn recompute_exact(&self, state: &mut ToyState) -> Result<()> {
            if self.fail_on_recompute {
                return Err(Error::ModelUnstable("singular".into()));
            }
            state.drift = 0.0;
            Ok(())
        }
    }

    struct SweepCount;

    impl Observable<ToyState> for SweepCount {
        fn name(&self) -> &str {
            "sweeps"
        }

        fn measure(&self, state: &ToyState) -> Measurement {
            Measurement::Scalar(state.sweeps as f64)
        }
    }

    struct Noise;

    impl Observable<ToyState> for Noise {
        fn name(&self) -> &str {
            "noise"
        }

        fn measure(&self, state: &ToyState) -> Measurement {
            Measurement::Scalar(state.noise)
        }
    }

    /// Vector whose length follows the sweep count, so its shape never settles.
    struct GrowingVector;

    impl Observable<ToyState> for GrowingVector {
        fn name(&self) -> &str {
            "grow"
        }

        fn measure(&self, state: &ToyState) -> Measurement {
            Measurement::Vector(nalgebra::DVector::zeros(state.sweeps))
        }
    }

    fn config(equilibration: usize, production: usize, bin_size: usize) -> RunConfiguration {
        RunConfiguration {
            equilibration_sweeps: equilibration,
            production_sweeps: production,
            bin_size,
            measurement_interval: 1,
            drift_target: 1e-3,
            recompute: RecomputeStrategy::FixedCadence { every: 1_000 },
        }
    }

    fn observables() -> Vec<Box<dyn Observable<ToyState>>> {
        vec![Box::new(SweepCount), Box::new(Noise)]
    }

    fn toy() -> ToyModel {
        ToyModel { drift_per_sweep: 0.0, fail_on_recompute: false }
    }

    #[test]
    fn test_trailing_partial_bin_is_dropped() {
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &config(0, 25, 10), &vec![0.0].into(), &toy(), &observables());
        assert_eq!(ctrl.phase(), RunPhase::Done);

        let series = outcome.series("sweeps").unwrap();
        assert_eq!(series.len(), 2);
        // bins cover sweeps 1..=10 and 11..=20
        assert_relative_eq!(series.bin_means[0].as_scalar().unwrap(), 5.5);
        assert_relative_eq!(series.bin_means[1].as_scalar().unwrap(), 15.5);
    }

    #[test]
    fn test_equilibration_is_not_measured() {
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &config(100, 10, 10), &vec![0.0].into(), &toy(), &observables());
        let series = outcome.series("sweeps").unwrap();
        assert_eq!(series.len(), 1);
        assert_relative_eq!(series.bin_means[0].as_scalar().unwrap(), 105.5);
    }

    #[test]
    fn test_measurement_interval() {
        let mut cfg = config(0, 40, 2);
        cfg.measurement_interval = 10;
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &cfg, &vec![0.0].into(), &toy(), &observables());
        let series = outcome.series("sweeps").unwrap();
        // measured at sweeps 10, 20, 30, 40
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.bin_means[0].as_scalar().unwrap(), 15.0);
        assert_relative_eq!(series.bin_means[1].as_scalar().unwrap(), 35.0);
    }

    #[test]
    fn test_short_production_yields_no_bins() {
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &config(0, 5, 10), &vec![0.0].into(), &toy(), &observables());
        assert!(outcome.is_success());
        assert!(outcome.series("sweeps").unwrap().is_empty());
    }

    #[test]
    fn test_drift_stats_count_every_sweep() {
        let model = ToyModel { drift_per_sweep: 4e-4, fail_on_recompute: false };
        let mut cfg = config(10, 30, 5);
        cfg.recompute = RecomputeStrategy::Reactive { max_misses: 1, max_interval: None };
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &cfg, &vec![0.0].into(), &model, &observables());
        match outcome.status {
            RunStatus::Success { drift, .. } => {
                assert_eq!(drift.hits + drift.misses, 40);
                // drift 4e-4, 8e-4 hit, 1.2e-3 miss -> recompute: every third sweep
                assert_eq!(drift.misses, 13);
                assert_eq!(drift.recalcs, 13);
                assert!(drift.mag1_hits <= drift.hits);
            }
            RunStatus::Failed { reason } => panic!("unexpected failure: {}", reason),
        }
    }

    #[test]
    fn test_prepare_failure_is_model_unstable() {
        let mut ctrl = RunController::new(SimContext::new(2, 3, 1));
        let outcome = ctrl.execute(5, &config(0, 10, 5), &vec![-1.0].into(), &toy(), &observables());
        assert_eq!(ctrl.phase(), RunPhase::Failed);
        assert_eq!(outcome.worker_id, 2);
        assert_eq!(outcome.run_id, 5);
        assert!(matches!(
            outcome.status,
            RunStatus::Failed { reason: FailureReason::ModelUnstable(_) }
        ));
    }

    #[test]
    fn test_recompute_failure_is_model_unstable() {
        let model = ToyModel { drift_per_sweep: 1.0, fail_on_recompute: true };
        let mut cfg = config(0, 10, 5);
        cfg.recompute = RecomputeStrategy::Reactive { max_misses: 1, max_interval: None };
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &cfg, &vec![0.0].into(), &model, &observables());
        assert_eq!(ctrl.phase(), RunPhase::Failed);
        assert!(matches!(
            outcome.status,
            RunStatus::Failed { reason: FailureReason::ModelUnstable(_) }
        ));
    }

    #[test]
    fn test_shape_change_fails_the_run() {
        let obs: Vec<Box<dyn Observable<ToyState>>> = vec![Box::new(GrowingVector)];
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &config(0, 10, 5), &vec![0.0].into(), &toy(), &obs);
        assert_eq!(ctrl.phase(), RunPhase::Failed);
        match outcome.status {
            RunStatus::Failed { reason: FailureReason::InconsistentObservable(msg) } => {
                assert!(msg.contains("grow"), "{}", msg);
            }
            other => panic!("expected InconsistentObservable, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_fails_the_run() {
        let mut ctrl = RunController::new(SimContext::new(0, 1, 1));
        let outcome = ctrl.execute(0, &config(0, 10, 0), &vec![0.0].into(), &toy(), &observables());
        assert!(matches!(
            outcome.status,
            RunStatus::Failed { reason: FailureReason::InvalidRequest(_) }
        ));
    }

    #[test]
    fn test_runs_are_reproducible_per_worker() {
        let cfg = config(5, 20, 4);
        let params: VariationalParameters = vec![0.0].into();
        let a = RunController::new(SimContext::new(1, 2, 9)).execute(3, &cfg, &params, &toy(), &observables());
        let b = RunController::new(SimContext::new(1, 2, 9)).execute(3, &cfg, &params, &toy(), &observables());
        let c = RunController::new(SimContext::new(0, 2, 9)).execute(3, &cfg, &params, &toy(), &observables());
        assert_eq!(a.series("noise"), b.series("noise"));
        assert_ne!(a.series("noise"), c.series("noise"));
    }
}
