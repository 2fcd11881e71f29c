//! Error types for spherical geometry construction.

use thiserror::Error;

/// Failures raised when a geometric value cannot be built from its inputs.
///
/// Routine "no answer" outcomes (an `alpha` with no real solution, the hull
/// of a non-hemispherical point set, the median of nothing) are `Option`s,
/// not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Malformed or degenerate input.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl GeometryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
