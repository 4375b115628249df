//! The latest-summary cache shared between the refresh loop and scrapes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto;

/// A single-slot holder for the latest published summary of one upstream
/// distribution metric.
///
/// The refresh loop replaces the held value wholesale with [`store`]; the
/// Prometheus registry reads it back through [`Collector::collect`] whenever a
/// scrape happens. The slot always holds either nothing or one complete
/// summary, so a scrape can race a refresh and still observe a consistent
/// count/sum/quantile set. Cloning shares the slot.
///
/// [`store`]: SnapshotCache::store
#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    desc: Desc,
    name: String,
    help: String,
    // Sorted by label name, matching Prometheus exposition order.
    labels: Vec<(String, String)>,
    slot: Mutex<Option<proto::MetricFamily>>,
}

impl SnapshotCache {
    /// Create an empty cache for a fully-qualified metric name with fixed
    /// label values.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        labels: HashMap<String, String>,
    ) -> std::result::Result<Self, prometheus::Error> {
        let name = name.into();
        let help = help.into();
        let desc = Desc::new(name.clone(), help.clone(), Vec::new(), labels.clone())?;
        let mut labels: Vec<(String, String)> = labels.into_iter().collect();
        labels.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            inner: Arc::new(CacheInner {
                desc,
                name,
                help,
                labels,
                slot: Mutex::new(None),
            }),
        })
    }

    /// Replace the held summary with a freshly built one.
    ///
    /// `quantiles` pairs each requested quantile with its value. The family is
    /// assembled before the lock is taken; the lock covers only the swap.
    pub fn store(&self, count: u64, sum: f64, quantiles: &[(f64, f64)]) {
        let family = self.build_family(count, sum, quantiles);
        *self.inner.slot.lock() = Some(family);
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.inner.slot.lock().is_none()
    }

    fn build_family(&self, count: u64, sum: f64, quantiles: &[(f64, f64)]) -> proto::MetricFamily {
        let mut summary = proto::Summary::default();
        summary.set_sample_count(count);
        summary.set_sample_sum(sum);
        for &(q, v) in quantiles {
            let mut quantile = proto::Quantile::default();
            quantile.set_quantile(q);
            quantile.set_value(v);
            summary.mut_quantile().push(quantile);
        }

        let mut metric = proto::Metric::default();
        for (name, value) in &self.inner.labels {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }
        metric.set_summary(summary);

        let mut family = proto::MetricFamily::default();
        family.set_name(self.inner.name.clone());
        family.set_help(self.inner.help.clone());
        family.set_field_type(proto::MetricType::SUMMARY);
        family.mut_metric().push(metric);
        family
    }
}

impl Collector for SnapshotCache {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.inner.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        match &*self.inner.slot.lock() {
            Some(family) => vec![family.clone()],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cache() -> SnapshotCache {
        SnapshotCache::new(
            "test_subsys_latency_timer",
            "latency",
            labels(&[("broker", "7"), ("topic", ""), ("label", "")]),
        )
        .unwrap()
    }

    #[test]
    fn test_collect_is_empty_before_first_store() {
        let cache = cache();
        assert!(cache.is_empty());
        assert!(cache.collect().is_empty());
    }

    #[test]
    fn test_store_publishes_a_complete_summary() {
        let cache = cache();
        cache.store(100, 129.0, &[(0.5, 1.0), (0.99, 9.95)]);

        let families = cache.collect();
        assert_eq!(families.len(), 1);
        let family = &families[0];
        assert_eq!(family.get_name(), "test_subsys_latency_timer");
        assert_eq!(family.get_field_type(), proto::MetricType::SUMMARY);

        let metric = &family.get_metric()[0];
        let summary = metric.get_summary();
        assert_eq!(summary.get_sample_count(), 100);
        assert_eq!(summary.get_sample_sum(), 129.0);

        let quantiles = summary.get_quantile();
        assert_eq!(quantiles.len(), 2);
        assert_eq!(quantiles[0].get_quantile(), 0.5);
        assert_eq!(quantiles[0].get_value(), 1.0);
        assert_eq!(quantiles[1].get_quantile(), 0.99);
        assert_eq!(quantiles[1].get_value(), 9.95);

        // Labels come out sorted by name.
        let names: Vec<&str> = metric.get_label().iter().map(|l| l.get_name()).collect();
        assert_eq!(names, vec!["broker", "label", "topic"]);
    }

    #[test]
    fn test_store_replaces_wholesale() {
        let cache = cache();
        cache.store(1, 1.0, &[(0.5, 1.0)]);
        cache.store(2, 3.0, &[(0.5, 1.5)]);

        let families = cache.collect();
        assert_eq!(families.len(), 1);
        let summary = families[0].get_metric()[0].get_summary();
        assert_eq!(summary.get_sample_count(), 2);
        assert_eq!(summary.get_sample_sum(), 3.0);
        assert_eq!(summary.get_quantile()[0].get_value(), 1.5);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let cache = cache();
        let registered = cache.clone();
        cache.store(5, 10.0, &[]);
        assert_eq!(registered.collect().len(), 1);
    }

    #[test]
    fn test_desc_carries_the_family_name() {
        let cache = cache();
        let descs = cache.desc();
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].fq_name, "test_subsys_latency_timer");
    }
}
