//! Translation of registry entries into Prometheus collectors.

use std::collections::HashMap;

use prometheus::{Gauge, GaugeVec, Opts, Registry};
use tracing::{debug, trace, warn};

use brokersight_registry::HistogramSnapshot;

use crate::error::{ExportError, Result};
use crate::mapping::{ParsedName, build_fq_name, parse_metric_name, sanitize_name};
use crate::snapshot::SnapshotCache;

/// Label names carried by every published gauge, in registration order.
pub const LABEL_NAMES: [&str; 3] = ["broker", "topic", "label"];

/// Which distribution shape a summary was derived from; becomes the family
/// name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Histogram,
    Timer,
}

impl DistributionKind {
    fn suffix(self) -> &'static str {
        match self {
            DistributionKind::Histogram => "histogram",
            DistributionKind::Timer => "timer",
        }
    }
}

/// Registration and update logic for published metrics.
///
/// Gauge families are keyed by their fully-qualified name (one `GaugeVec` per
/// base name), bound children by the raw upstream name (one series per
/// upstream metric). Summary caches are keyed by the prefixed raw name so
/// same-base metrics with different labels stay independent.
pub struct MetricPublisher {
    prom: Registry,
    namespace: String,
    subsystem: String,
    label: String,
    families: HashMap<String, GaugeVec>,
    gauges: HashMap<String, Gauge>,
    summaries: HashMap<String, SnapshotCache>,
}

impl MetricPublisher {
    pub fn new(prom: Registry, namespace: String, subsystem: String, label: String) -> Self {
        Self {
            prom,
            namespace,
            subsystem,
            label,
            families: HashMap::new(),
            gauges: HashMap::new(),
            summaries: HashMap::new(),
        }
    }

    /// Publish one instant-value sample, creating and registering the gauge
    /// family on first use. The write is a last-value overwrite.
    pub fn publish_value(&mut self, raw_name: &str, value: f64) -> Result<()> {
        let parsed = parse_metric_name(raw_name);
        if parsed.skip {
            trace!(metric = raw_name, "skipping metric without broker or topic");
            return Ok(());
        }

        if !self.gauges.contains_key(raw_name) {
            let gauge = self.bind_gauge(raw_name, &parsed)?;
            self.gauges.insert(raw_name.to_string(), gauge);
        }
        if let Some(gauge) = self.gauges.get(raw_name) {
            gauge.set(value);
        }
        Ok(())
    }

    fn bind_gauge(&mut self, raw_name: &str, parsed: &ParsedName) -> Result<Gauge> {
        let base = sanitize_name(&parsed.base);
        let namespace = sanitize_name(&self.namespace);
        let subsystem = sanitize_name(&self.subsystem);
        let fq_name = build_fq_name(&namespace, &subsystem, &base);

        if !self.families.contains_key(&fq_name) {
            let opts = Opts::new(base.clone(), base.clone())
                .namespace(namespace)
                .subsystem(subsystem);
            let family = GaugeVec::new(opts, &LABEL_NAMES).map_err(|source| {
                ExportError::Registration {
                    name: raw_name.to_string(),
                    source,
                }
            })?;
            match self.prom.register(Box::new(family.clone())) {
                Ok(()) => {
                    debug!(metric = raw_name, family = %fq_name, "registered gauge family");
                }
                Err(prometheus::Error::AlreadyReg) => {
                    // An equivalent family already exists, typically because
                    // another exporter shares this registry. Publishing
                    // continues through the local handle.
                    debug!(metric = raw_name, family = %fq_name, "gauge family already registered");
                }
                Err(source) => {
                    return Err(ExportError::Registration {
                        name: raw_name.to_string(),
                        source,
                    });
                }
            }
            self.families.insert(fq_name.clone(), family);
        }

        self.families[&fq_name]
            .get_metric_with_label_values(&[&parsed.broker, &parsed.topic, &self.label])
            .map_err(|source| ExportError::InvalidLabels {
                name: raw_name.to_string(),
                source,
            })
    }

    /// Publish one distribution snapshot: the freshest sample as an
    /// instant-value gauge, and the full count/sum/quantile set as an
    /// immutable summary replacing the previous one.
    pub fn publish_distribution(
        &mut self,
        raw_name: &str,
        snapshot: &HistogramSnapshot,
        kind: DistributionKind,
        quantiles: &[f64],
    ) -> Result<()> {
        let parsed = parse_metric_name(raw_name);
        if parsed.skip {
            trace!(metric = raw_name, "skipping metric without broker or topic");
            return Ok(());
        }

        if let Some(last) = snapshot.last() {
            self.publish_value(raw_name, last as f64)?;
        }

        let key = format!("{}_{}_{}", self.namespace, self.subsystem, raw_name);
        if !self.summaries.contains_key(&key) {
            let cache = self.create_summary(raw_name, &parsed, kind)?;
            self.summaries.insert(key.clone(), cache);
        }

        let values = snapshot.percentiles(quantiles);
        let pairs: Vec<(f64, f64)> = quantiles.iter().copied().zip(values).collect();
        if let Some(cache) = self.summaries.get(&key) {
            cache.store(snapshot.count(), snapshot.sum() as f64, &pairs);
        }
        Ok(())
    }

    fn create_summary(
        &mut self,
        raw_name: &str,
        parsed: &ParsedName,
        kind: DistributionKind,
    ) -> Result<SnapshotCache> {
        let base = sanitize_name(&parsed.base);
        let fq_name = build_fq_name(
            &sanitize_name(&self.namespace),
            &sanitize_name(&self.subsystem),
            &format!("{base}_{}", kind.suffix()),
        );
        let labels = HashMap::from([
            ("broker".to_string(), parsed.broker.clone()),
            ("topic".to_string(), parsed.topic.clone()),
            ("label".to_string(), self.label.clone()),
        ]);

        let cache = SnapshotCache::new(fq_name.clone(), base, labels).map_err(|source| {
            ExportError::Registration {
                name: raw_name.to_string(),
                source,
            }
        })?;
        // Unlike gauge families, summary collectors are created exactly once
        // per upstream name for the exporter's lifetime; a conflict here is a
        // real error.
        self.prom
            .register(Box::new(cache.clone()))
            .map_err(|source| ExportError::Registration {
                name: raw_name.to_string(),
                source,
            })?;
        debug!(metric = raw_name, family = %fq_name, "registered summary collector");
        Ok(cache)
    }

    /// Deregister every published gauge family so no stale instant-value
    /// series outlive the exporter. Summary collectors stay registered.
    pub fn unregister_values(&mut self) -> Result<()> {
        self.gauges.clear();
        let mut first_err = None;
        for (fq_name, family) in self.families.drain() {
            if let Err(source) = self.prom.unregister(Box::new(family)) {
                warn!(family = %fq_name, error = %source, "failed to unregister gauge family");
                if first_err.is_none() {
                    first_err = Some(ExportError::Unregister {
                        name: fq_name,
                        source,
                    });
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokersight_registry::UniformSample;

    fn publisher(prom: &Registry) -> MetricPublisher {
        MetricPublisher::new(
            prom.clone(),
            "test".to_string(),
            "subsys".to_string(),
            String::new(),
        )
    }

    fn gauge_value(prom: &Registry, family: &str, broker: &str) -> Option<f64> {
        prom.gather()
            .iter()
            .find(|mf| mf.get_name() == family)
            .and_then(|mf| {
                mf.get_metric()
                    .iter()
                    .find(|m| {
                        m.get_label()
                            .iter()
                            .any(|l| l.get_name() == "broker" && l.get_value() == broker)
                    })
                    .map(|m| m.get_gauge().get_value())
            })
    }

    #[test]
    fn test_publish_value_is_last_write_wins() {
        let prom = Registry::new();
        let mut publisher = publisher(&prom);

        publisher.publish_value("requests-for-broker-1", 3.0).unwrap();
        publisher.publish_value("requests-for-broker-1", 7.0).unwrap();

        assert_eq!(gauge_value(&prom, "test_subsys_requests", "1"), Some(7.0));
    }

    #[test]
    fn test_same_base_different_brokers_share_one_family() {
        let prom = Registry::new();
        let mut publisher = publisher(&prom);

        publisher.publish_value("requests-for-broker-1", 1.0).unwrap();
        publisher.publish_value("requests-for-broker-2", 2.0).unwrap();

        let families = prom.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_metric().len(), 2);
        assert_eq!(gauge_value(&prom, "test_subsys_requests", "1"), Some(1.0));
        assert_eq!(gauge_value(&prom, "test_subsys_requests", "2"), Some(2.0));
    }

    #[test]
    fn test_skip_names_leave_no_residue() {
        let prom = Registry::new();
        let mut publisher = publisher(&prom);

        publisher.publish_value("connection-count", 9.0).unwrap();
        assert!(prom.gather().is_empty());
    }

    #[test]
    fn test_empty_distribution_publishes_summary_but_no_gauge() {
        let prom = Registry::new();
        let mut publisher = publisher(&prom);

        let snapshot = UniformSample::default().snapshot();
        publisher
            .publish_distribution(
                "latency-for-broker-3",
                &snapshot,
                DistributionKind::Timer,
                &[0.5],
            )
            .unwrap();

        let families = prom.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "test_subsys_latency_timer");
        let summary = families[0].get_metric()[0].get_summary();
        assert_eq!(summary.get_sample_count(), 0);
    }

    #[test]
    fn test_unregister_values_removes_gauges_keeps_summaries() {
        let prom = Registry::new();
        let mut publisher = publisher(&prom);

        publisher.publish_value("requests-for-broker-1", 1.0).unwrap();
        let sample = UniformSample::default();
        sample.update(4);
        publisher
            .publish_distribution(
                "latency-for-broker-1",
                &sample.snapshot(),
                DistributionKind::Histogram,
                &[0.5],
            )
            .unwrap();

        publisher.unregister_values().unwrap();

        let names: Vec<String> = prom
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();
        assert!(!names.contains(&"test_subsys_requests".to_string()));
        assert!(names.contains(&"test_subsys_latency_histogram".to_string()));

        // Repeated unregistration is a no-op.
        publisher.unregister_values().unwrap();
    }
}
