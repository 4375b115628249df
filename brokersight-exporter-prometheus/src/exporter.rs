//! Exporter lifecycle: initial refresh, scheduling, stop.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use brokersight_registry::{Metric, MetricsSource};

use crate::config::{ErrorPolicy, Options};
use crate::error::{ExportError, Result};
use crate::publisher::{DistributionKind, MetricPublisher};
use crate::scheduler::Scheduler;

struct ExporterCore {
    source: Arc<dyn MetricsSource>,
    publisher: Mutex<MetricPublisher>,
    histogram_quantiles: Vec<f64>,
    timer_quantiles: Vec<f64>,
    on_error: ErrorPolicy,
}

impl ExporterCore {
    /// One full pass over the upstream registry.
    ///
    /// Every entry is attempted; the first error encountered is kept and
    /// returned after the pass completes, so one bad metric cannot block the
    /// rest.
    fn refresh(&self) -> Result<()> {
        let mut publisher = self.publisher.lock();
        let mut first_err: Option<ExportError> = None;
        self.source.each(&mut |name, metric| {
            if let Err(err) = self.publish_entry(&mut publisher, name, metric) {
                debug!(metric = name, error = %err, "failed to publish metric");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        });
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn publish_entry(
        &self,
        publisher: &mut MetricPublisher,
        name: &str,
        metric: &Metric,
    ) -> Result<()> {
        match metric {
            Metric::Counter(counter) => publisher.publish_value(name, counter.count() as f64),
            Metric::Gauge(gauge) => publisher.publish_value(name, gauge.value() as f64),
            Metric::GaugeFloat(gauge) => publisher.publish_value(name, gauge.value()),
            // Meters publish current throughput, not the cumulative count.
            Metric::Meter(meter) => publisher.publish_value(name, meter.snapshot().rate1()),
            Metric::Histogram(histogram) => {
                let snapshot = histogram.snapshot();
                publisher.publish_distribution(
                    name,
                    &snapshot,
                    DistributionKind::Histogram,
                    &self.histogram_quantiles,
                )
            }
            Metric::Timer(timer) => {
                let snapshot = timer.snapshot();
                publisher.publish_distribution(
                    name,
                    snapshot.distribution(),
                    DistributionKind::Timer,
                    &self.timer_quantiles,
                )
            }
            Metric::Healthcheck(_) => Err(ExportError::UnsupportedMetric {
                name: name.to_string(),
                kind: metric.kind(),
            }),
        }
    }

    fn handle_scheduled_error(&self, err: ExportError) {
        match &self.on_error {
            // A panic would only kill the scheduler task; the whole process
            // must go down.
            ErrorPolicy::Abort => {
                error!(error = %err, "scheduled refresh failed, aborting");
                std::process::abort();
            }
            ErrorPolicy::Log => error!(error = %err, "scheduled refresh failed"),
            ErrorPolicy::Custom(handler) => handler(err),
        }
    }
}

/// Handle to a running exporter.
///
/// Dropping the handle terminates the background refresh task; published
/// metrics then keep their last values until deregistered. Call
/// [`Exporter::stop`] for the full teardown.
pub struct Exporter {
    core: Arc<ExporterCore>,
    scheduler: Scheduler,
    unregister_on_stop: bool,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("unregister_on_stop", &self.unregister_on_stop)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    /// Stop the refresh loop and, unless configured otherwise, deregister the
    /// published instant-value metrics so stale series are not left visible.
    /// Summary collectors stay registered and keep advertising their last
    /// snapshot. Safe to call more than once.
    pub fn stop(&self) -> Result<()> {
        self.scheduler.stop();
        if self.unregister_on_stop {
            self.core.publisher.lock().unregister_values()?;
        }
        Ok(())
    }
}

/// Start bridging a metrics registry into Prometheus.
///
/// Performs one synchronous refresh first, so a misconfiguration (conflicting
/// Prometheus collectors, untranslatable metric kinds) surfaces to the caller
/// before any background work starts, then schedules repeated refreshes at
/// the configured interval. Errors from those later refreshes go to
/// [`Options::on_error`].
///
/// Must be called within a Tokio runtime.
pub fn export_metrics(source: Arc<dyn MetricsSource>, options: Options) -> Result<Exporter> {
    let opts = options.resolve();
    let publisher = MetricPublisher::new(
        opts.registry,
        opts.namespace,
        opts.subsystem,
        opts.label,
    );
    let core = Arc::new(ExporterCore {
        source,
        publisher: Mutex::new(publisher),
        histogram_quantiles: opts.histogram_quantiles,
        timer_quantiles: opts.timer_quantiles,
        on_error: opts.on_error,
    });

    core.refresh()?;

    let job_core = core.clone();
    let scheduler = Scheduler::start(opts.refresh_interval, move || {
        if let Err(err) = job_core.refresh() {
            job_core.handle_scheduled_error(err);
        }
    });
    debug!(interval = ?opts.refresh_interval, "exporter started");

    Ok(Exporter {
        core,
        scheduler,
        unregister_on_stop: opts.unregister_on_stop,
    })
}
