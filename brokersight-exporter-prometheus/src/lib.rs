//! Prometheus bridge for BrokerSight metrics registries.
//!
//! This crate republishes an in-process metrics registry (counters, gauges,
//! histograms, meters and timers named in the Kafka client convention:
//! `requests-for-broker-7`, `bytes-for-topic-events`) into a Prometheus
//! registry. A background task snapshots the upstream registry on a fixed
//! interval; scrapes read the latest published values on their own schedule.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ Metrics registry │────>│     Exporter     │────>│    Prometheus    │
//! │ (app counters,   │     │ (parse, publish, │     │ registry (read   │
//! │  timers, ...)    │     │  refresh loop)   │     │  at scrape time) │
//! └──────────────────┘     └──────────────────┘     └──────────────────┘
//! ```
//!
//! Name-embedded metadata becomes labels: `requests-for-broker-7` turns into
//! the series `requests{broker="7",topic="",label=""}`. Names carrying
//! neither marker are per-process aggregates and are not republished.
//! Histograms and timers additionally publish an immutable quantile summary
//! under a `_histogram`/`_timer` suffix, replaced wholesale on every refresh.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use brokersight_registry::{Counter, Metric, Registry};
//! use brokersight_exporter_prometheus::{Options, export_metrics};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new();
//!     let requests = Arc::new(Counter::new());
//!     registry.register("requests-for-broker-1", Metric::Counter(requests.clone()))?;
//!
//!     let exporter = export_metrics(Arc::new(registry), Options::default())?;
//!
//!     requests.inc(1);
//!     // ... application runs, Prometheus scrapes ...
//!
//!     exporter.stop()?;
//!     Ok(())
//! }
//! ```
//!
//! See [`Options`] for configuration.

pub mod config;
pub mod error;
pub mod exporter;
pub mod mapping;
pub mod publisher;
pub mod scheduler;
pub mod snapshot;

// Re-export commonly used types at the crate root
pub use config::{
    DEFAULT_HISTOGRAM_QUANTILES, DEFAULT_REFRESH_INTERVAL, DEFAULT_SUBSYSTEM,
    DEFAULT_TIMER_QUANTILES, ErrorPolicy, Options,
};
pub use error::{ExportError, Result};
pub use exporter::{Exporter, export_metrics};
pub use mapping::{ParsedName, parse_metric_name, sanitize_name};
pub use scheduler::Scheduler;
pub use snapshot::SnapshotCache;
