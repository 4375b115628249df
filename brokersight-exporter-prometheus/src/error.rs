//! Error types for the Prometheus bridge.

use thiserror::Error;

/// Result type alias using [`ExportError`].
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors raised while translating registry entries into Prometheus state.
#[derive(Error, Debug)]
pub enum ExportError {
    /// An upstream entry has a kind this bridge cannot translate. Recorded
    /// per entry; the rest of the refresh proceeds.
    #[error("unsupported metric kind {kind:?} for metric {name:?}")]
    UnsupportedMetric { name: String, kind: &'static str },

    /// The Prometheus registry rejected a registration for a reason other
    /// than an equivalent collector already existing (e.g. a same-named
    /// collector of a different shape).
    #[error("failed to register metric {name:?}: {source}")]
    Registration {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    /// A published gauge family refused the label values derived from the
    /// metric name. This is a programming-contract violation, not an
    /// expected runtime condition.
    #[error("failed to resolve label values for metric {name:?}: {source}")]
    InvalidLabels {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    /// The Prometheus registry refused to deregister a published gauge.
    #[error("failed to unregister metric {name:?}: {source}")]
    Unregister {
        name: String,
        #[source]
        source: prometheus::Error,
    },
}
