//! YAML run description.
//!
//! ```yaml
//! lattice: { kind: square, side: 4 }
//! electrons: 10
//! hamiltonian: { t: [1.0, 0.0, 0.0], u: 4.0 }
//! parameters: [1.0, 0.0, 0.0, 0.5]
//! run:
//!   equilibration_sweeps: 200
//!   production_sweeps: 2000
//!   bin_size: 20
//!   drift_target: 1.0e-6
//! workers: 4
//! seed: 12345
//! continuation: { kind: fixed_iterations, iterations: 1 }
//! observables: [energy, double_occupancy, density_correlation]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lattice::{Chain1D, Lattice, Square2D};
use crate::observables::{build_observables, HubbardHamiltonian, ObservableKind};
use crate::sampling::{RunConfiguration, VariationalParameters};
use crate::sched::{ContinuationConfig, RunSetup, Scheduler};
use crate::systems::{HubbardModel, NUM_PARAMS};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatticeConfig {
    Chain { length: usize },
    Square { side: usize },
}

impl LatticeConfig {
    pub fn build(&self) -> Result<Arc<dyn Lattice>> {
        match *self {
            LatticeConfig::Chain { length } if length >= 2 => Ok(Arc::new(Chain1D::new(length))),
            LatticeConfig::Square { side } if side >= 2 => Ok(Arc::new(Square2D::new(side))),
            _ => Err(Error::InvalidConfig(format!("lattice too small: {:?}", self))),
        }
    }
}

fn default_parameters() -> VariationalParameters {
    vec![1.0, 0.0, 0.0, 0.0].into()
}

fn default_workers() -> usize {
    1
}

fn default_timeout() -> u64 {
    3600
}

fn default_max_iterations() -> usize {
    100
}

fn default_observables() -> Vec<ObservableKind> {
    vec![ObservableKind::Energy]
}

/// Everything needed to run a simulation from the command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    pub electrons: usize,
    #[serde(default)]
    pub hamiltonian: HubbardHamiltonian,
    /// `[t1, t2, t3, g]` of the trial wavefunction
    #[serde(default = "default_parameters")]
    pub parameters: VariationalParameters,
    #[serde(default)]
    pub run: RunConfiguration,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub seed: u64,
    /// Fleet-wide deadline for one iteration
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub continuation: ContinuationConfig,
    #[serde(default = "default_observables")]
    pub observables: Vec<ObservableKind>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        let lattice = self.lattice.build()?;
        HubbardModel::new(lattice, self.electrons)?;
        if self.parameters.len() != NUM_PARAMS {
            return Err(Error::InvalidConfig(format!(
                "expected {} variational parameters, got {}",
                NUM_PARAMS,
                self.parameters.len()
            )));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("need at least one worker".into()));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig("max_iterations must be at least 1".into()));
        }
        self.run.validate()?;
        self.continuation.build().map(|_| ())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Master scheduler described by this configuration.
    pub fn scheduler(&self) -> Result<Scheduler> {
        Ok(Scheduler::new(self.continuation.build()?)
            .with_timeout(self.timeout())
            .with_max_iterations(self.max_iterations)
            .with_observables(self.observables.iter().map(|k| k.name())))
    }

    /// Fresh model and observables for one run.
    pub fn setup_run(&self) -> Result<RunSetup<HubbardModel>> {
        let lattice = self.lattice.build()?;
        let observables = build_observables(&self.observables, &lattice, &self.hamiltonian);
        let model = HubbardModel::new(lattice, self.electrons)?;
        Ok((model, observables))
    }
}

/// Read and validate a YAML configuration file.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let config: SimulationConfig = serde_yaml::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "lattice: { kind: chain, length: 8 }\nelectrons: 4\n";

    #[test]
    fn test_minimal_config_defaults() {
        let cfg: SimulationConfig = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.parameters.len(), NUM_PARAMS);
        assert_eq!(cfg.observables, vec![ObservableKind::Energy]);
        assert_eq!(cfg.run, RunConfiguration::default());
        assert_eq!(cfg.output, None);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
lattice: { kind: square, side: 4 }
electrons: 10
hamiltonian: { t: [1.0, -0.2, 0.0], u: 8.0 }
parameters: [1.0, -0.2, 0.0, 0.7]
run:
  equilibration_sweeps: 10
  production_sweeps: 100
  bin_size: 5
  measurement_interval: 2
  drift_target: 1.0e-8
  recompute: { kind: fixed_cadence, every: 10 }
workers: 3
seed: 7
timeout_secs: 60
continuation: { kind: fixed_iterations, iterations: 2 }
observables: [energy, density_correlation]
output: out.yml
"#;
        let cfg: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.lattice.build().unwrap().len(), 16);
        assert_eq!(cfg.hamiltonian.u, 8.0);
        assert_eq!(cfg.run.expected_bins(), 10);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.output, Some(PathBuf::from("out.yml")));

        let (model, observables) = cfg.setup_run().unwrap();
        assert_eq!(model.electrons(), 10);
        assert_eq!(observables.len(), 2);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let odd = "lattice: { kind: chain, length: 8 }\nelectrons: 3\n";
        let cfg: SimulationConfig = serde_yaml::from_str(odd).unwrap();
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let params = format!("{}parameters: [1.0, 0.5]\n", MINIMAL);
        let cfg: SimulationConfig = serde_yaml::from_str(&params).unwrap();
        assert!(cfg.validate().is_err());

        let workers = format!("{}workers: 0\n", MINIMAL);
        let cfg: SimulationConfig = serde_yaml::from_str(&workers).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_read_config_missing_file() {
        assert!(matches!(read_config("/nonexistent/hvmc.yml"), Err(Error::Io(_))));
    }
}
