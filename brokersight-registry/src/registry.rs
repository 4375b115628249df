//! The name-keyed metrics registry and its consumption boundary.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{RegistryError, Result};
use crate::metrics::Metric;

/// The read boundary consumers depend on: one callback invocation per
/// currently-registered metric. Iteration order is unspecified.
pub trait MetricsSource: Send + Sync {
    fn each(&self, f: &mut dyn FnMut(&str, &Metric));
}

/// A thread-safe registry of named metrics.
///
/// Cloning is cheap and shares the underlying map. The read lock is held for
/// the whole of [`Registry::each`], so callbacks must not register or
/// unregister metrics.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    metrics: Arc<RwLock<HashMap<String, Metric>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric under a name. Names are unique; registering a taken
    /// name fails without replacing the existing metric.
    pub fn register(&self, name: impl Into<String>, metric: Metric) -> Result<()> {
        let name = name.into();
        let mut metrics = self.metrics.write();
        match metrics.entry(name) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateMetric {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                trace!(metric = %entry.key(), kind = metric.kind(), "registered metric");
                entry.insert(metric);
                Ok(())
            }
        }
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    /// Remove a metric by name. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.metrics.write().remove(name).is_some();
        if removed {
            trace!(metric = name, "unregistered metric");
        }
        removed
    }

    /// Names of all registered metrics, in unspecified order.
    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// Invoke `f` once per registered metric.
    pub fn each<F: FnMut(&str, &Metric)>(&self, mut f: F) {
        for (name, metric) in self.metrics.read().iter() {
            f(name, metric);
        }
    }
}

impl MetricsSource for Registry {
    fn each(&self, f: &mut dyn FnMut(&str, &Metric)) {
        Registry::each(self, f);
    }
}
