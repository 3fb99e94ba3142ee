//! IO module - configuration input and run artifact output.

mod config;

use std::path::Path;

pub use config::{read_config, LatticeConfig, SimulationConfig};

use crate::error::Result;
use crate::sched::SimulationRecord;

/// Write the structured run record as YAML.
pub fn write_record<P: AsRef<Path>>(path: P, record: &SimulationRecord) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_yaml::to_writer(writer, record)?;
    Ok(())
}

/// Read back a record written by [`write_record`].
pub fn read_record<P: AsRef<Path>>(path: P) -> Result<SimulationRecord> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    Ok(serde_yaml::from_reader(reader)?)
}
