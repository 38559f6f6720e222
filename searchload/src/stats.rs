//! Latency statistics.
//!
//! Percentiles use linear interpolation between closest ranks (the R-7 method,
//! same as numpy's default):
//!
//! ```text
//! index  = (n - 1) * p / 100
//! lower  = floor(index), upper = ceil(index)
//! weight = index - lower
//! value  = sorted[lower] * (1 - weight) + sorted[upper] * weight
//! ```
//!
//! An empty sample set has no average and no percentiles, every entry point
//! returns [`Error::EmptySamples`] instead of NaN or a panic.

use crate::error::{Error, Result};

/// Percentile `p` (clamped to `0..=100`) of an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(Error::EmptySamples);
    }
    Ok(interpolate(sorted, p))
}

// `sorted` must be non-empty.
fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let index = (sorted.len() - 1) as f64 * (p.clamp(0.0, 100.0) / 100.0);
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Arithmetic mean. Order does not matter.
pub fn average(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(Error::EmptySamples);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// A non-empty, ascending set of latency samples (milliseconds).
///
/// Sorting happens once, in [`Latencies::new`]; every accessor after that is
/// cheap and infallible.
#[derive(Clone, Debug, PartialEq)]
pub struct Latencies {
    sorted: Vec<f64>,
}

impl Latencies {
    pub fn new(mut samples: Vec<f64>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptySamples);
        }
        samples.sort_unstable_by(f64::total_cmp);
        Ok(Self { sorted: samples })
    }

    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    pub fn average(&self) -> f64 {
        self.sorted.iter().sum::<f64>() / self.sorted.len() as f64
    }

    pub fn percentile(&self, p: f64) -> f64 {
        interpolate(&self.sorted, p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn interpolates_between_ranks() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_close(percentile(&sorted, 50.0).unwrap(), 30.0);
        // index 3.8 -> 40 * 0.2 + 50 * 0.8
        assert_close(percentile(&sorted, 95.0).unwrap(), 48.0);
        assert_close(percentile(&sorted, 99.0).unwrap(), 49.6);
        assert_close(percentile(&sorted, 25.0).unwrap(), 20.0);
    }

    #[test]
    fn extremes_are_min_and_max() {
        let latencies = Latencies::new(vec![7.5, 3.0, 99.0, 42.0, 0.5, 12.0]).unwrap();
        assert_eq!(latencies.percentile(0.0), latencies.min());
        assert_eq!(latencies.percentile(100.0), latencies.max());
        assert_eq!(latencies.min(), 0.5);
        assert_eq!(latencies.max(), 99.0);
    }

    #[test]
    fn out_of_range_percentiles_are_clamped() {
        let sorted = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&sorted, -5.0).unwrap(), 1.0);
        assert_eq!(percentile(&sorted, 250.0).unwrap(), 3.0);
    }

    #[test]
    fn single_sample_is_every_percentile() {
        let latencies = Latencies::new(vec![17.0]).unwrap();
        for p in [0.0, 50.0, 95.0, 99.0, 100.0] {
            assert_eq!(latencies.percentile(p), 17.0);
        }
        assert_eq!(latencies.average(), 17.0);
    }

    #[test]
    fn sorting_does_not_change_the_average() {
        let samples = vec![120.0, 3.5, 48.25, 7.0, 999.0, 0.25, 61.0];
        let unsorted = average(&samples).unwrap();
        let latencies = Latencies::new(samples.clone()).unwrap();
        assert_close(latencies.average(), unsorted);
        assert_close(unsorted, samples.iter().sum::<f64>() / 7.0);
    }

    #[test]
    fn new_sorts_ascending() {
        let latencies = Latencies::new(vec![5.0, 1.0, 4.0, 2.0, 3.0]).unwrap();
        assert_eq!(latencies.min(), 1.0);
        assert_eq!(latencies.max(), 5.0);
        assert_eq!(latencies.percentile(25.0), 2.0);
        assert_eq!(latencies.percentile(75.0), 4.0);
    }

    #[test]
    fn empty_samples_fail_explicitly() {
        assert!(matches!(Latencies::new(vec![]), Err(Error::EmptySamples)));
        assert!(matches!(percentile(&[], 50.0), Err(Error::EmptySamples)));
        assert!(matches!(average(&[]), Err(Error::EmptySamples)));
    }
}
