//! Values produced by observables.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// A single scalar or fixed-length vector value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Measurement {
    Scalar(f64),
    Vector(DVector<f64>),
}

/// Shape of a measurement; all measurements of one observable share it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Vector(usize),
}

impl Measurement {
    pub fn shape(&self) -> Shape {
        match self {
            Measurement::Scalar(_) => Shape::Scalar,
            Measurement::Vector(v) => Shape::Vector(v.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Measurement::Scalar(x) => Some(*x),
            Measurement::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&DVector<f64>> {
        match self {
            Measurement::Scalar(_) => None,
            Measurement::Vector(v) => Some(v),
        }
    }

    /// A zero measurement of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        match shape {
            Shape::Scalar => Measurement::Scalar(0.0),
            Shape::Vector(n) => Measurement::Vector(DVector::zeros(n)),
        }
    }

    /// Apply `f` element-wise.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Measurement::Scalar(x) => Measurement::Scalar(f(*x)),
            Measurement::Vector(v) => Measurement::Vector(v.map(f)),
        }
    }

    /// Combine two measurements of equal shape element-wise.
    pub fn zip_map(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        match (self, other) {
            (Measurement::Scalar(a), Measurement::Scalar(b)) => Measurement::Scalar(f(*a, *b)),
            (Measurement::Vector(a), Measurement::Vector(b)) => {
                Measurement::Vector(a.zip_map(b, f))
            }
            _ => panic!("measurement shape mismatch: {:?} vs {:?}", self.shape(), other.shape()),
        }
    }
}

impl From<f64> for Measurement {
    fn from(x: f64) -> Self {
        Measurement::Scalar(x)
    }
}

impl From<DVector<f64>> for Measurement {
    fn from(v: DVector<f64>) -> Self {
        Measurement::Vector(v)
    }
}

/// Values that can be summed into a bin and reduced to a mean.
pub trait Binnable: Clone {
    fn accumulate(&mut self, other: &Self);
    fn divided_by(self, n: f64) -> Self;
}

impl Binnable for f64 {
    fn accumulate(&mut self, other: &Self) {
        *self += *other;
    }

    fn divided_by(self, n: f64) -> Self {
        self / n
    }
}

impl Binnable for DVector<f64> {
    fn accumulate(&mut self, other: &Self) {
        *self += other;
    }

    fn divided_by(self, n: f64) -> Self {
        self / n
    }
}

impl Binnable for Measurement {
    fn accumulate(&mut self, other: &Self) {
        match (self, other) {
            (Measurement::Scalar(a), Measurement::Scalar(b)) => a.accumulate(b),
            (Measurement::Vector(a), Measurement::Vector(b)) => a.accumulate(b),
            (a, b) => panic!("observable changed shape mid-run: {:?} vs {:?}", a.shape(), b.shape()),
        }
    }

    fn divided_by(self, n: f64) -> Self {
        match self {
            Measurement::Scalar(x) => Measurement::Scalar(x.divided_by(n)),
            Measurement::Vector(v) => Measurement::Vector(v.divided_by(n)),
        }
    }
}
