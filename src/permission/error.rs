//! Errors raised by the permission algebra.

use thiserror::Error;

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// Values were set for more than one value mode.
    #[error("Dimension '{dimension}' sets conflicting fields: {}", .fields.join(", "))]
    ConflictingModes {
        dimension: String,
        fields: Vec<&'static str>,
    },

    /// Binary operator applied to filters on different dimensions.
    #[error("Cannot combine filters on different dimensions: '{left}' and '{right}'")]
    DimensionMismatch { left: String, right: String },
}
