//! Statistics module - drift control, binning and cross-worker aggregation.

mod aggregate;
mod binning;
mod fpctrl;
mod measurement;

pub use aggregate::{AggregatedResult, Estimate, ObservableAggregator, ObservableSeries};
pub use binning::BinAccumulator;
pub use fpctrl::{calc_deviation, DriftMonitor, DriftStats};
pub use measurement::{Binnable, Measurement, Shape};
