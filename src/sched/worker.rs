//! Worker side of the distributed VMC loop.

use tracing::{debug, info, warn};

use super::messages::{Request, RunRequest};
use super::transport::WorkerLink;
use crate::context::SimContext;
use crate::error::{FailureReason, Result};
use crate::sampling::{Model, Observable, RunController, RunOutcome};

/// Model and observables for one run.
pub type RunSetup<M> = (M, Vec<Box<dyn Observable<<M as Model>::State>>>);

/// Serve run requests until `Terminate` arrives or the master hangs up.
///
/// `setup` builds a fresh model and observable set for each request. A setup
/// error is reported as a failed outcome; the worker keeps serving. Returns
/// the number of runs completed.
pub fn run_worker<W, M, F>(ctx: SimContext, link: &mut W, mut setup: F) -> Result<usize>
where
    W: WorkerLink,
    M: Model,
    F: FnMut(&RunRequest) -> Result<RunSetup<M>>,
{
    let worker = ctx.worker_id;
    let mut runs = 0;
    loop {
        let request = match link.recv() {
            Some(Request::Run(request)) => request,
            Some(Request::Terminate) => {
                info!(worker, runs, "terminated by master");
                return Ok(runs);
            }
            None => {
                debug!(worker, runs, "master hung up");
                return Ok(runs);
            }
        };

        let outcome = match setup(&request) {
            Ok((model, observables)) => {
                let mut controller = RunController::new(ctx);
                controller.execute(
                    request.run_id,
                    &request.config,
                    &request.parameters,
                    &model,
                    &observables,
                )
            }
            Err(err) => {
                warn!(worker, run_id = request.run_id, error = %err, "run setup failed");
                RunOutcome::failed(request.run_id, worker, FailureReason::from(&err))
            }
        };
        link.send(outcome)?;
        runs += 1;
    }
}
