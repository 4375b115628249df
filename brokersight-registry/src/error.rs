//! Error types for the metrics registry.

use thiserror::Error;

/// Result type alias using [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur when manipulating a [`crate::Registry`].
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A metric with this name is already registered.
    #[error("duplicate metric: {name:?}")]
    DuplicateMetric { name: String },
}
