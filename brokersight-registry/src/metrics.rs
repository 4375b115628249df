//! Metric handles and the [`Metric`] sum type.
//!
//! Every handle is internally synchronized and intended to be shared behind an
//! [`Arc`]: application code keeps a clone to update, the registry keeps
//! another for readers to snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::ewma::{Ewma, TICK_INTERVAL};
use crate::sample::{HistogramSnapshot, UniformSample};

/// A monotonically adjustable signed count.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to the count.
    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Subtract `n` from the count.
    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    /// Current count.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// An instantaneous integer value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the current value.
    pub fn update(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Current value.
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// An instantaneous floating-point value, stored as atomic bits.
#[derive(Debug, Default)]
pub struct GaugeFloat {
    bits: AtomicU64,
}

impl GaugeFloat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the current value.
    pub fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// A sampled distribution of integer values.
#[derive(Debug, Default)]
pub struct Histogram {
    sample: UniformSample,
}

impl Histogram {
    /// Histogram backed by a uniform reservoir of the given size.
    pub fn new(reservoir_size: usize) -> Self {
        Self {
            sample: UniformSample::new(reservoir_size),
        }
    }

    /// Record one value.
    pub fn update(&self, value: i64) {
        self.sample.update(value);
    }

    /// Total number of recorded values.
    pub fn count(&self) -> u64 {
        self.sample.count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.sample.clear();
    }

    /// Point-in-time view of the distribution.
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.sample.snapshot()
    }
}

/// An event-rate meter with exponentially-decayed 1/5/15-minute rates.
#[derive(Debug)]
pub struct Meter {
    state: Mutex<MeterState>,
}

#[derive(Debug)]
struct MeterState {
    count: i64,
    uncounted: i64,
    rate1: Ewma,
    rate5: Ewma,
    rate15: Ewma,
    start: Instant,
    last_tick: Instant,
}

impl Meter {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(MeterState {
                count: 0,
                uncounted: 0,
                rate1: Ewma::one_minute(),
                rate5: Ewma::five_minute(),
                rate15: Ewma::fifteen_minute(),
                start: now,
                last_tick: now,
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: i64) {
        let mut state = self.state.lock();
        state.tick_if_needed();
        state.count += n;
        state.uncounted += n;
    }

    /// Total number of events recorded.
    pub fn count(&self) -> i64 {
        self.state.lock().count
    }

    /// Point-in-time view of count and rates.
    pub fn snapshot(&self) -> MeterSnapshot {
        let mut state = self.state.lock();
        state.tick_if_needed();
        let elapsed = state.start.elapsed().as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };
        MeterSnapshot {
            count: state.count,
            rate1: state.rate1.rate(),
            rate5: state.rate5.rate(),
            rate15: state.rate15.rate(),
            rate_mean,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterState {
    // Decay ticks are applied lazily: catch up on however many 5-second
    // intervals elapsed since the last access. Only the first pending tick
    // carries the uncounted events; the rest are idle.
    fn tick_if_needed(&mut self) {
        let elapsed = self.last_tick.elapsed();
        let ticks = (elapsed.as_nanos() / TICK_INTERVAL.as_nanos()) as u32;
        for _ in 0..ticks {
            self.rate1.tick(self.uncounted);
            self.rate5.tick(self.uncounted);
            self.rate15.tick(self.uncounted);
            self.uncounted = 0;
        }
        if ticks > 0 {
            self.last_tick += TICK_INTERVAL * ticks;
        }
    }
}

/// Immutable view of a [`Meter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    count: i64,
    rate1: f64,
    rate5: f64,
    rate15: f64,
    rate_mean: f64,
}

impl MeterSnapshot {
    /// Total number of events recorded.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// One-minute exponentially-decayed rate, events per second.
    pub fn rate1(&self) -> f64 {
        self.rate1
    }

    /// Five-minute exponentially-decayed rate, events per second.
    pub fn rate5(&self) -> f64 {
        self.rate5
    }

    /// Fifteen-minute exponentially-decayed rate, events per second.
    pub fn rate15(&self) -> f64 {
        self.rate15
    }

    /// Lifetime mean rate, events per second.
    pub fn rate_mean(&self) -> f64 {
        self.rate_mean
    }
}

/// A histogram of durations plus a meter of occurrences.
///
/// Durations are recorded as nanoseconds.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one duration.
    pub fn update(&self, duration: Duration) {
        self.histogram.update(duration.as_nanos() as i64);
        self.meter.mark(1);
    }

    /// Time a closure and record its duration.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.update(start.elapsed());
        out
    }

    /// Total number of recorded durations.
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    /// Point-in-time view of the duration distribution and rates.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            distribution: self.histogram.snapshot(),
            rates: self.meter.snapshot(),
        }
    }
}

/// Immutable view of a [`Timer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    distribution: HistogramSnapshot,
    rates: MeterSnapshot,
}

impl TimerSnapshot {
    /// Distribution of recorded durations, in nanoseconds.
    pub fn distribution(&self) -> &HistogramSnapshot {
        &self.distribution
    }

    /// Occurrence rates.
    pub fn rates(&self) -> &MeterSnapshot {
        &self.rates
    }
}

/// A registrable liveness check.
///
/// Healthchecks live in the registry next to numeric metrics but carry no
/// exportable value.
#[derive(Debug, Default)]
pub struct Healthcheck {
    error: Mutex<Option<String>>,
}

impl Healthcheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the check as failing with a message.
    pub fn set_error(&self, message: impl Into<String>) {
        *self.error.lock() = Some(message.into());
    }

    /// Mark the check as healthy.
    pub fn clear_error(&self) {
        *self.error.lock() = None;
    }

    /// Whether the check currently passes.
    pub fn healthy(&self) -> bool {
        self.error.lock().is_none()
    }

    /// The failure message, if any.
    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }
}

/// A registered metric of any supported shape.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeFloat(Arc<GaugeFloat>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    Healthcheck(Arc<Healthcheck>),
}

impl Metric {
    /// Static kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::GaugeFloat(_) => "gauge_float",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
            Metric::Healthcheck(_) => "healthcheck",
        }
    }
}
