//! Message passing between the master and its workers.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Instant;

use super::messages::Request;
use crate::error::{Error, Result};
use crate::sampling::RunOutcome;

/// Master side of the fleet.
pub trait MasterLink {
    fn n_workers(&self) -> usize;

    /// Deliver a request to one worker. Fails if the worker is gone.
    fn send(&mut self, worker: usize, request: &Request) -> Result<()>;

    /// Next outcome from any worker, or `None` once `deadline` passed or
    /// every worker hung up.
    fn recv_until(&mut self, deadline: Instant) -> Option<RunOutcome>;

    /// Send `request` to every worker; returns the workers it could not reach.
    fn broadcast(&mut self, request: &Request) -> Vec<usize> {
        (0..self.n_workers())
            .filter(|&w| self.send(w, request).is_err())
            .collect()
    }
}

/// Worker side of the fleet.
pub trait WorkerLink {
    /// Block until the next request; `None` if the master hung up.
    fn recv(&mut self) -> Option<Request>;

    fn send(&mut self, outcome: RunOutcome) -> Result<()>;
}

/// In-process master endpoint over `std::sync::mpsc`.
pub struct ChannelMaster {
    requests: Vec<Sender<Request>>,
    outcomes: Receiver<RunOutcome>,
}

/// In-process worker endpoint over `std::sync::mpsc`.
pub struct ChannelWorker {
    worker_id: usize,
    requests: Receiver<Request>,
    outcomes: Sender<RunOutcome>,
}

impl ChannelWorker {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}

/// Create a master endpoint and `n` connected worker endpoints.
pub fn channel_fleet(n: usize) -> (ChannelMaster, Vec<ChannelWorker>) {
    let (outcome_tx, outcome_rx) = channel();
    let mut requests = Vec::with_capacity(n);
    let mut workers = Vec::with_capacity(n);
    for worker_id in 0..n {
        let (tx, rx) = channel();
        requests.push(tx);
        workers.push(ChannelWorker {
            worker_id,
            requests: rx,
            outcomes: outcome_tx.clone(),
        });
    }
    (ChannelMaster { requests, outcomes: outcome_rx }, workers)
}

impl MasterLink for ChannelMaster {
    fn n_workers(&self) -> usize {
        self.requests.len()
    }

    fn send(&mut self, worker: usize, request: &Request) -> Result<()> {
        let tx = self
            .requests
            .get(worker)
            .ok_or_else(|| Error::Transport(format!("no worker {}", worker)))?;
        tx.send(request.clone())
            .map_err(|_| Error::Transport(format!("worker {} hung up", worker)))
    }

    fn recv_until(&mut self, deadline: Instant) -> Option<RunOutcome> {
        let now = Instant::now();
        if deadline <= now {
            return match self.outcomes.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
            };
        }
        match self.outcomes.recv_timeout(deadline - now) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl WorkerLink for ChannelWorker {
    fn recv(&mut self) -> Option<Request> {
        self.requests.recv().ok()
    }

    fn send(&mut self, outcome: RunOutcome) -> Result<()> {
        self.outcomes
            .send(outcome)
            .map_err(|_| Error::Transport("master hung up".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;
    use std::time::Duration;

    #[test]
    fn test_round_trip_over_channels() {
        let (mut master, mut workers) = channel_fleet(2);
        assert_eq!(master.n_workers(), 2);
        assert!(master.broadcast(&Request::Terminate).is_empty());
        for w in workers.iter_mut() {
            assert_eq!(w.recv(), Some(Request::Terminate));
        }

        workers[1]
            .send(RunOutcome::failed(0, 1, FailureReason::WorkerUnresponsive))
            .unwrap();
        let got = master.recv_until(Instant::now() + Duration::from_secs(1)).unwrap();
        assert_eq!(got.worker_id, 1);
    }

    #[test]
    fn test_recv_times_out() {
        let (mut master, _workers) = channel_fleet(1);
        let start = Instant::now();
        assert!(master.recv_until(start + Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_dropped_worker_is_unreachable() {
        let (mut master, mut workers) = channel_fleet(2);
        drop(workers.remove(0));
        assert_eq!(master.broadcast(&Request::Terminate), vec![0]);
    }
}
