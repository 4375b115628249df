//! BrokerSight Metrics Registry
//!
//! An in-process, pull-style metrics registry keyed by metric name. Application
//! code updates cheap cloneable handles (counters, gauges, histograms, meters,
//! timers) from any thread; consumers read point-in-time snapshots on their own
//! schedule, typically through the [`MetricsSource`] iteration boundary.
//!
//! - [`metrics`] - Metric handles and the [`Metric`] sum type
//! - [`sample`] - Uniform reservoir sampling and percentile snapshots
//! - [`ewma`] - Exponentially-weighted moving averages backing meter rates
//! - [`registry`] - The name-keyed registry and the [`MetricsSource`] trait
//! - [`error`] - Error types

pub mod error;
pub mod ewma;
pub mod metrics;
pub mod registry;
pub mod sample;

// Re-export commonly used types at the crate root
pub use error::{RegistryError, Result};
pub use ewma::Ewma;
pub use metrics::{
    Counter, Gauge, GaugeFloat, Healthcheck, Histogram, Meter, MeterSnapshot, Metric, Timer,
    TimerSnapshot,
};
pub use registry::{MetricsSource, Registry};
pub use sample::{HistogramSnapshot, UniformSample};
