//! Cross-worker pooling of bin means.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::measurement::{Measurement, Shape};
use crate::error::{Error, Result};

/// Bin means of one observable from one worker's run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservableSeries {
    pub name: String,
    pub bin_means: Vec<Measurement>,
}

impl ObservableSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), bin_means: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.bin_means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bin_means.is_empty()
    }
}

/// Mean and standard error of one observable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: Measurement,
    pub error: Measurement,
    pub bins: usize,
}

/// Per-observable estimates of one iteration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub estimates: BTreeMap<String, Estimate>,
}

impl AggregatedResult {
    pub fn get(&self, observable: &str) -> Option<&Estimate> {
        self.estimates.get(observable)
    }

    /// Scalar mean and error of an observable, if it is scalar.
    pub fn scalar(&self, observable: &str) -> Option<(f64, f64)> {
        let est = self.estimates.get(observable)?;
        Some((est.mean.as_scalar()?, est.error.as_scalar()?))
    }
}

/// Collects worker series at the master and reduces them.
///
/// Samples are keyed by worker id, so the pooled order (and therefore the
/// floating point result) does not depend on the order in which workers
/// happened to report.
#[derive(Clone, Debug, Default)]
pub struct ObservableAggregator {
    requested: Vec<String>,
    pooled: BTreeMap<String, BTreeMap<usize, Vec<Measurement>>>,
}

impl ObservableAggregator {
    /// An aggregator that must produce an estimate for every `requested` observable.
    pub fn new<I, S>(requested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requested: requested.into_iter().map(Into::into).collect(),
            pooled: BTreeMap::new(),
        }
    }

    pub fn collect(&mut self, worker_id: usize, series: ObservableSeries) {
        // The first series of an observable must also agree with itself.
        let expected = self
            .shape_of(&series.name)
            .or_else(|| series.bin_means.first().map(Measurement::shape));
        if let Some(bad) = expected
            .and_then(|shape| series.bin_means.iter().find(|m| m.shape() != shape))
        {
            warn!(
                worker = worker_id,
                observable = %series.name,
                expected = ?expected,
                got = ?bad.shape(),
                "dropping series with inconsistent shape"
            );
            return;
        }

        self.pooled
            .entry(series.name)
            .or_default()
            .entry(worker_id)
            .or_default()
            .extend(series.bin_means);
    }

    /// Total pooled bins for an observable.
    pub fn bins(&self, observable: &str) -> usize {
        self.pooled
            .get(observable)
            .map(|per_worker| per_worker.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn shape_of(&self, observable: &str) -> Option<Shape> {
        self.pooled
            .get(observable)?
            .values()
            .flat_map(|bins| bins.iter())
            .next()
            .map(Measurement::shape)
    }

    pub fn finalize(&self) -> Result<AggregatedResult> {
        let mut names: Vec<&String> = self.requested.iter().collect();
        for name in self.pooled.keys() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let mut estimates = BTreeMap::new();
        for name in names {
            let samples: Vec<&Measurement> = self
                .pooled
                .get(name)
                .map(|per_worker| per_worker.values().flatten().collect())
                .unwrap_or_default();
            let estimate = estimate(&samples).ok_or_else(|| Error::InsufficientData {
                observable: name.clone(),
                bins: samples.len(),
            })?;
            estimates.insert(name.clone(), estimate);
        }
        Ok(AggregatedResult { estimates })
    }
}

/// Arithmetic mean and standard error `s / sqrt(n)` with the unbiased
/// sample standard deviation `s`. `None` for fewer than two samples.
fn estimate(samples: &[&Measurement]) -> Option<Estimate> {
    let n = samples.len();
    if n < 2 {
        return None;
    }
    let shape = samples[0].shape();

    let mut sum = Measurement::zeros(shape);
    for s in samples {
        sum = sum.zip_map(s, |a, b| a + b);
    }
    let mean = sum.map(|x| x / n as f64);

    let mut sq = Measurement::zeros(shape);
    for s in samples {
        sq = sq.zip_map(&s.zip_map(&mean, |x, m| x - m), |acc, d| acc + d * d);
    }
    let error = sq.map(|x| (x / (n - 1) as f64).sqrt() / (n as f64).sqrt());

    Some(Estimate { mean, error, bins: n })
}
