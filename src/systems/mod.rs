//! Systems module - physical models sampled by the run controller.

mod hubbard;

pub use hubbard::{HubbardModel, HubbardState, Spin, NUM_PARAMS};
