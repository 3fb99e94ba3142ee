//! Per-run inputs broadcast by the master.

use serde::{Deserialize, Serialize};

use super::recompute::RecomputeStrategy;
use crate::error::{Error, Result};

/// Ordered real-valued variational parameters of the trial wavefunction.
///
/// Workers only ever see a read-only copy for the duration of one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariationalParameters {
    values: Vec<f64>,
}

impl VariationalParameters {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }
}

impl From<Vec<f64>> for VariationalParameters {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

fn default_interval() -> usize {
    1
}

/// Run length, binning and drift control settings for one run.
///
/// `bin_size` counts measurements, so a bin spans
/// `bin_size * measurement_interval` sweeps. Production measurements that do
/// not fill a complete bin are dropped at the end of the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub equilibration_sweeps: usize,
    pub production_sweeps: usize,
    pub bin_size: usize,
    #[serde(default = "default_interval")]
    pub measurement_interval: usize,
    /// Target deviation of incrementally updated quantities
    pub drift_target: f64,
    #[serde(default)]
    pub recompute: RecomputeStrategy,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            equilibration_sweeps: 100,
            production_sweeps: 1000,
            bin_size: 10,
            measurement_interval: 1,
            drift_target: 1e-6,
            recompute: RecomputeStrategy::default(),
        }
    }
}

impl RunConfiguration {
    pub fn validate(&self) -> Result<()> {
        if self.bin_size == 0 {
            return Err(Error::InvalidConfig("bin_size must be at least 1".into()));
        }
        if self.measurement_interval == 0 {
            return Err(Error::InvalidConfig("measurement_interval must be at least 1".into()));
        }
        if !(self.drift_target > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "drift_target must be positive, got {}",
                self.drift_target
            )));
        }
        self.recompute.validate()
    }

    /// Number of complete bins a production phase yields.
    pub fn expected_bins(&self) -> usize {
        self.production_sweeps / self.measurement_interval / self.bin_size
    }

    /// Set production length.
    pub fn with_production_sweeps(mut self, n: usize) -> Self {
        self.production_sweeps = n;
        self
    }

    /// Set bin size.
    pub fn with_bin_size(mut self, n: usize) -> Self {
        self.bin_size = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_degenerate_settings() {
        assert!(RunConfiguration::default().validate().is_ok());
        assert!(RunConfiguration::default().with_bin_size(0).validate().is_err());

        let mut cfg = RunConfiguration::default();
        cfg.measurement_interval = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfiguration::default();
        cfg.drift_target = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_expected_bins_drops_remainder() {
        let cfg = RunConfiguration::default()
            .with_production_sweeps(25)
            .with_bin_size(10);
        assert_eq!(cfg.expected_bins(), 2);
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = "equilibration_sweeps: 10\nproduction_sweeps: 50\nbin_size: 5\ndrift_target: 1.0e-4\n";
        let cfg: RunConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.measurement_interval, 1);
        assert_eq!(cfg.recompute, RecomputeStrategy::default());
        assert_eq!(cfg.expected_bins(), 10);
    }
}
