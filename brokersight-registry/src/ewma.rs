//! Exponentially-weighted moving averages.

use std::time::Duration;

/// Interval between EWMA decay ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// An exponentially-weighted moving average of an event rate.
///
/// Rates are kept internally in events per nanosecond and ticked on a fixed
/// 5-second cadence; callers are responsible for driving [`Ewma::tick`]
/// (meters apply the required number of ticks lazily on access).
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    /// Create an EWMA with an explicit smoothing factor.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            rate: 0.0,
            initialized: false,
        }
    }

    /// EWMA decaying over a one-minute window.
    pub fn one_minute() -> Self {
        Self::new(alpha_for_minutes(1.0))
    }

    /// EWMA decaying over a five-minute window.
    pub fn five_minute() -> Self {
        Self::new(alpha_for_minutes(5.0))
    }

    /// EWMA decaying over a fifteen-minute window.
    pub fn fifteen_minute() -> Self {
        Self::new(alpha_for_minutes(15.0))
    }

    /// Apply one decay tick covering `uncounted` events observed since the
    /// previous tick. The first tick seeds the average with the instant rate.
    pub fn tick(&mut self, uncounted: i64) {
        let instant_rate = uncounted as f64 / TICK_INTERVAL.as_nanos() as f64;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Current rate in events per second. Zero until the first tick.
    pub fn rate(&self) -> f64 {
        self.rate * 1e9
    }
}

fn alpha_for_minutes(minutes: f64) -> f64 {
    1.0 - (-(TICK_INTERVAL.as_secs_f64()) / 60.0 / minutes).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(got: f64, want: f64) {
        assert!(
            (got - want).abs() < 1e-9,
            "expected {want}, got {got}"
        );
    }

    #[test]
    fn test_rate_is_zero_before_first_tick() {
        let ewma = Ewma::one_minute();
        assert_close(ewma.rate(), 0.0);
    }

    #[test]
    fn test_first_tick_seeds_instant_rate() {
        let mut ewma = Ewma::one_minute();
        ewma.tick(5);
        // 5 events over a 5-second tick: 1 event/s.
        assert_close(ewma.rate(), 1.0);
    }

    #[test]
    fn test_idle_ticks_decay_the_rate() {
        let mut ewma = Ewma::one_minute();
        ewma.tick(5);
        let seeded = ewma.rate();
        ewma.tick(0);
        let decayed = ewma.rate();
        assert!(decayed < seeded);
        assert!(decayed > 0.0);
        // One idle one-minute tick keeps (1 - alpha) of the rate.
        assert_close(decayed, seeded * (-5.0f64 / 60.0).exp());
    }

    #[test]
    fn test_sustained_rate_converges() {
        let mut ewma = Ewma::one_minute();
        for _ in 0..200 {
            ewma.tick(5);
        }
        assert_close(ewma.rate(), 1.0);
    }

    #[test]
    fn test_longer_windows_decay_slower() {
        let mut one = Ewma::one_minute();
        let mut fifteen = Ewma::fifteen_minute();
        one.tick(5);
        fifteen.tick(5);
        one.tick(0);
        fifteen.tick(0);
        assert!(fifteen.rate() > one.rate());
    }
}
