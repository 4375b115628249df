//! Uniform reservoir sampling and distribution snapshots.

use parking_lot::Mutex;
use rand::Rng;

/// Reservoir size used when none is given.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// A uniform random sample of a value stream (Vitter's algorithm R).
///
/// Keeps a fixed-size reservoir in which every value observed so far has an
/// equal probability of appearing, alongside exact totals for count and sum.
#[derive(Debug)]
pub struct UniformSample {
    reservoir_size: usize,
    state: Mutex<SampleState>,
}

#[derive(Debug, Default)]
struct SampleState {
    count: u64,
    sum: i64,
    values: Vec<i64>,
}

impl UniformSample {
    /// Create a sample with the given reservoir size.
    pub fn new(reservoir_size: usize) -> Self {
        Self {
            reservoir_size,
            state: Mutex::new(SampleState::default()),
        }
    }

    /// Record one value.
    pub fn update(&self, value: i64) {
        let mut state = self.state.lock();
        state.count += 1;
        state.sum = state.sum.wrapping_add(value);
        if state.values.len() < self.reservoir_size {
            state.values.push(value);
        } else {
            let r = rand::rng().random_range(0..state.count);
            if (r as usize) < state.values.len() {
                state.values[r as usize] = value;
            }
        }
    }

    /// Forget everything observed so far.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.count = 0;
        state.sum = 0;
        state.values.clear();
    }

    /// Total number of values observed (not the reservoir occupancy).
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// Point-in-time copy of the sample.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let state = self.state.lock();
        HistogramSnapshot {
            count: state.count,
            sum: state.sum,
            values: state.values.clone(),
        }
    }
}

impl Default for UniformSample {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE)
    }
}

/// An immutable point-in-time view of a sampled distribution.
///
/// `count` and `sum` are exact totals over the full stream; the reservoir copy
/// (in insertion order) backs percentile estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    count: u64,
    sum: i64,
    values: Vec<i64>,
}

impl HistogramSnapshot {
    /// Total number of values observed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Exact sum of all observed values.
    pub fn sum(&self) -> i64 {
        self.sum
    }

    /// The most recently written reservoir slot, if any value was sampled.
    pub fn last(&self) -> Option<i64> {
        self.values.last().copied()
    }

    /// Smallest sampled value.
    pub fn min(&self) -> Option<i64> {
        self.values.iter().min().copied()
    }

    /// Largest sampled value.
    pub fn max(&self) -> Option<i64> {
        self.values.iter().max().copied()
    }

    /// Mean over the full stream (0 when empty).
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Estimate a single quantile in `[0, 1]`.
    pub fn percentile(&self, q: f64) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_unstable();
        rank(&sorted, q)
    }

    /// Estimate several quantiles at once, sorting the reservoir only once.
    ///
    /// Uses rank interpolation at position `q * (n + 1)`, clamped to the
    /// sampled range, with linear interpolation between neighboring values.
    pub fn percentiles(&self, qs: &[f64]) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_unstable();
        qs.iter().map(|&q| rank(&sorted, q)).collect()
    }
}

fn rank(sorted: &[i64], q: f64) -> f64 {
    let size = sorted.len();
    if size == 0 {
        return 0.0;
    }
    let pos = q * (size as f64 + 1.0);
    if pos < 1.0 {
        sorted[0] as f64
    } else if pos >= size as f64 {
        sorted[size - 1] as f64
    } else {
        let lower = sorted[pos as usize - 1] as f64;
        let upper = sorted[pos as usize] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }
}
