//! Exporter configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;

use crate::error::ExportError;

/// Quantiles published for histogram-backed summaries when none are
/// configured.
pub const DEFAULT_HISTOGRAM_QUANTILES: [f64; 8] =
    [0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99];

/// Quantiles published for timer-backed summaries when none are configured.
pub const DEFAULT_TIMER_QUANTILES: [f64; 4] = [0.5, 0.95, 0.99, 0.999];

/// Subsystem name segment used when none is configured.
pub const DEFAULT_SUBSYSTEM: &str = "kafka";

/// Refresh interval used when none is configured.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// What to do with an error raised by a scheduled refresh.
///
/// The initial refresh performed during [`crate::export_metrics`] bypasses
/// this policy and surfaces its error to the caller directly.
#[derive(Clone, Default)]
pub enum ErrorPolicy {
    /// Log and abort the process. A broken refresh loop is treated as
    /// unrecoverable.
    #[default]
    Abort,
    /// Emit an error-level tracing event and keep the schedule running; the
    /// next tick attempts a full refresh independently.
    Log,
    /// Invoke a caller-supplied handler.
    Custom(Arc<dyn Fn(ExportError) + Send + Sync>),
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Abort => f.write_str("Abort"),
            ErrorPolicy::Log => f.write_str("Log"),
            ErrorPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Options for [`crate::export_metrics`].
///
/// Every field has a "leave unset" form (empty string, zero duration, `None`)
/// that resolves to a default when the exporter starts.
#[derive(Clone)]
pub struct Options {
    /// First metric name prefix segment. Default: none.
    pub namespace: String,

    /// Second metric name prefix segment. Default: `"kafka"`.
    pub subsystem: String,

    /// Value of the static `label` label attached to every published metric.
    /// Default: empty.
    pub label: String,

    /// Interval between refreshes. Default: one second.
    pub refresh_interval: Duration,

    /// Target Prometheus registry. Default: the process default registry.
    pub registry: Option<Registry>,

    /// Quantiles published for histograms. Default:
    /// [`DEFAULT_HISTOGRAM_QUANTILES`].
    pub histogram_quantiles: Option<Vec<f64>>,

    /// Quantiles published for timers. Default: [`DEFAULT_TIMER_QUANTILES`].
    pub timer_quantiles: Option<Vec<f64>>,

    /// Policy for errors raised by scheduled refreshes. Default: abort.
    pub on_error: ErrorPolicy,

    /// Deregister published gauges when the exporter stops, so stale series
    /// disappear from scrapes. Default: true.
    pub unregister_on_stop: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            subsystem: String::new(),
            label: String::new(),
            refresh_interval: Duration::ZERO,
            registry: None,
            histogram_quantiles: None,
            timer_quantiles: None,
            on_error: ErrorPolicy::default(),
            unregister_on_stop: true,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("namespace", &self.namespace)
            .field("subsystem", &self.subsystem)
            .field("label", &self.label)
            .field("refresh_interval", &self.refresh_interval)
            .field("registry", &self.registry.as_ref().map(|_| "custom"))
            .field("histogram_quantiles", &self.histogram_quantiles)
            .field("timer_quantiles", &self.timer_quantiles)
            .field("on_error", &self.on_error)
            .field("unregister_on_stop", &self.unregister_on_stop)
            .finish()
    }
}

impl Options {
    pub(crate) fn resolve(self) -> ResolvedOptions {
        ResolvedOptions {
            namespace: self.namespace,
            subsystem: if self.subsystem.is_empty() {
                DEFAULT_SUBSYSTEM.to_string()
            } else {
                self.subsystem
            },
            label: self.label,
            refresh_interval: if self.refresh_interval.is_zero() {
                DEFAULT_REFRESH_INTERVAL
            } else {
                self.refresh_interval
            },
            registry: self
                .registry
                .unwrap_or_else(|| prometheus::default_registry().clone()),
            histogram_quantiles: self
                .histogram_quantiles
                .unwrap_or_else(|| DEFAULT_HISTOGRAM_QUANTILES.to_vec()),
            timer_quantiles: self
                .timer_quantiles
                .unwrap_or_else(|| DEFAULT_TIMER_QUANTILES.to_vec()),
            on_error: self.on_error,
            unregister_on_stop: self.unregister_on_stop,
        }
    }
}

/// [`Options`] with every default applied.
pub(crate) struct ResolvedOptions {
    pub namespace: String,
    pub subsystem: String,
    pub label: String,
    pub refresh_interval: Duration,
    pub registry: Registry,
    pub histogram_quantiles: Vec<f64>,
    pub timer_quantiles: Vec<f64>,
    pub on_error: ErrorPolicy,
    pub unregister_on_stop: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_applied_on_resolve() {
        let resolved = Options::default().resolve();
        assert_eq!(resolved.namespace, "");
        assert_eq!(resolved.subsystem, DEFAULT_SUBSYSTEM);
        assert_eq!(resolved.label, "");
        assert_eq!(resolved.refresh_interval, DEFAULT_REFRESH_INTERVAL);
        assert_eq!(resolved.histogram_quantiles, DEFAULT_HISTOGRAM_QUANTILES);
        assert_eq!(resolved.timer_quantiles, DEFAULT_TIMER_QUANTILES);
        assert!(resolved.unregister_on_stop);
        assert!(matches!(resolved.on_error, ErrorPolicy::Abort));
    }

    #[test]
    fn test_explicit_values_survive_resolve() {
        let registry = Registry::new();
        let resolved = Options {
            namespace: "app".to_string(),
            subsystem: "consumer".to_string(),
            label: "blue".to_string(),
            refresh_interval: Duration::from_millis(250),
            registry: Some(registry),
            histogram_quantiles: Some(vec![0.5]),
            timer_quantiles: Some(vec![0.9]),
            on_error: ErrorPolicy::Log,
            unregister_on_stop: false,
        }
        .resolve();

        assert_eq!(resolved.namespace, "app");
        assert_eq!(resolved.subsystem, "consumer");
        assert_eq!(resolved.label, "blue");
        assert_eq!(resolved.refresh_interval, Duration::from_millis(250));
        assert_eq!(resolved.histogram_quantiles, vec![0.5]);
        assert_eq!(resolved.timer_quantiles, vec![0.9]);
        assert!(!resolved.unregister_on_stop);
        assert!(matches!(resolved.on_error, ErrorPolicy::Log));
    }
}
