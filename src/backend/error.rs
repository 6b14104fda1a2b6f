//! Errors raised by the backend predicate library.

use thiserror::Error;

/// Result type for predicate operations.
pub type PredicateResult<T> = Result<T, PredicateError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    /// A native filter of a known kind is missing a required member.
    #[error("Malformed '{kind}' filter: {message}")]
    Malformed { kind: String, message: String },

    /// Native JSON that is neither an object nor null.
    #[error("Expected a filter object or null, found {found}")]
    NotAnObject { found: &'static str },

    /// Native JSON nested deeper than the decoder allows.
    #[error("Native filter exceeds maximum depth of {max}")]
    TooDeep { max: usize },

    /// Native JSON list member longer than the decoder allows.
    #[error("Native filter '{member}' has {len} entries, maximum is {max}")]
    TooWide { member: String, len: usize, max: usize },

    /// A native backend filter has no SQL rendering.
    #[error("Native '{kind}' filter cannot be rendered as SQL")]
    UnsupportedNative { kind: String },
}
