//! Fixed-size binning of a single observable's measurement stream.
//!
//! Consecutive Monte Carlo measurements are autocorrelated. Grouping them
//! into bins of `bin_size` entries and keeping only the bin means gives
//! samples that can be treated as independent once the bin is long compared
//! to the autocorrelation time.

use super::measurement::Binnable;

/// Accumulates measurements into bins and emits bin means.
#[derive(Clone, Debug)]
pub struct BinAccumulator<T: Binnable> {
    bin_size: usize,
    sum: Option<T>,
    count: usize,
}

impl<T: Binnable> BinAccumulator<T> {
    /// `bin_size` must be at least one.
    pub fn new(bin_size: usize) -> Self {
        assert!(bin_size >= 1, "bin size must be at least 1");
        Self { bin_size, sum: None, count: 0 }
    }

    pub fn bin_size(&self) -> usize {
        self.bin_size
    }

    /// Measurements sitting in the current, incomplete bin.
    pub fn pending(&self) -> usize {
        self.count
    }

    /// Add one measurement. Returns the bin mean when the bin completes.
    pub fn push(&mut self, value: T) -> Option<T> {
        match self.sum.as_mut() {
            Some(sum) => sum.accumulate(&value),
            None => self.sum = Some(value),
        }
        self.count += 1;

        if self.count < self.bin_size {
            return None;
        }
        self.count = 0;
        self.sum.take().map(|sum| sum.divided_by(self.bin_size as f64))
    }

    /// Drop an incomplete trailing bin; returns how many measurements were discarded.
    pub fn discard_partial(&mut self) -> usize {
        let dropped = self.count;
        self.sum = None;
        self.count = 0;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::Measurement;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn test_full_bin_returns_mean() {
        let mut acc = BinAccumulator::<f64>::new(4);
        assert_eq!(acc.push(1.0), None);
        assert_eq!(acc.push(2.0), None);
        assert_eq!(acc.push(3.0), None);
        let mean = acc.push(6.0).expect("bin should complete");
        assert_relative_eq!(mean, 3.0);
        assert_eq!(acc.pending(), 0);

        // next bin starts from scratch
        assert_eq!(acc.push(10.0), None);
        assert_eq!(acc.push(10.0), None);
        assert_eq!(acc.push(10.0), None);
        assert_relative_eq!(acc.push(10.0).unwrap(), 10.0);
    }

    #[test]
    fn test_incomplete_bin_never_emits() {
        let k = 7;
        let mut acc = BinAccumulator::<f64>::new(k);
        for i in 0..k - 1 {
            assert!(acc.push(i as f64).is_none());
        }
        assert_eq!(acc.pending(), k - 1);
        assert_eq!(acc.discard_partial(), k - 1);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn test_bin_size_one_passes_through() {
        let mut acc = BinAccumulator::<f64>::new(1);
        assert_eq!(acc.push(-2.5), Some(-2.5));
        assert_eq!(acc.push(4.0), Some(4.0));
    }

    #[test]
    fn test_vector_bins_elementwise() {
        let mut acc = BinAccumulator::<DVector<f64>>::new(2);
        assert!(acc.push(DVector::from_vec(vec![1.0, 0.0, 4.0])).is_none());
        let mean = acc.push(DVector::from_vec(vec![3.0, 1.0, -4.0])).unwrap();
        assert_eq!(mean, DVector::from_vec(vec![2.0, 0.5, 0.0]));
    }

    #[test]
    fn test_measurement_bins_match_raw_scalars() {
        let values = [0.3, -1.2, 5.5, 2.25, 0.0, 7.0];
        let mut raw = BinAccumulator::<f64>::new(3);
        let mut wrapped = BinAccumulator::<Measurement>::new(3);
        for &v in values.iter() {
            let a = raw.push(v);
            let b = wrapped.push(Measurement::Scalar(v));
            assert_eq!(a.map(Measurement::Scalar), b);
        }
    }
}
