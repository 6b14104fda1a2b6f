//! Errors raised while decoding filter trees from their wire form.

use thiserror::Error;

use crate::backend::PredicateError;

/// Result type for filter deserialization.
pub type DeserializeResult<T> = Result<T, DeserializeError>;

/// Error type for filter deserialization.
///
/// Decoding is atomic: any error anywhere in the tree fails the whole tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeserializeError {
    #[error("Unknown {expected} type '{tag}'")]
    UnknownTag { tag: String, expected: &'static str },

    #[error("Missing 'type' discriminator for {expected}")]
    MissingTag { expected: &'static str },

    #[error("Expected {expected} object, found {found}")]
    NotAnObject {
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{tag}' filter is missing required field '{field}'")]
    MissingField { tag: String, field: &'static str },

    #[error("'{tag}' filter field '{field}' must be {expected}")]
    InvalidField {
        tag: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Empty filter object is not allowed in '{field}'")]
    EmptyNested { field: String },

    #[error("Filter tree is deeper than the limit of {max}")]
    DepthExceeded { max: usize },

    #[error("'{field}' has {len} entries, more than the limit of {max}")]
    WidthExceeded {
        field: String,
        len: usize,
        max: usize,
    },

    #[error("Invalid backend predicate: {0}")]
    Predicate(#[from] PredicateError),

    /// An error inside a nested field, tagged with where it happened.
    #[error("In '{path}': {source}")]
    Nested {
        path: String,
        #[source]
        source: Box<DeserializeError>,
    },
}

impl DeserializeError {
    pub(crate) fn nested(path: impl Into<String>, source: DeserializeError) -> Self {
        DeserializeError::Nested {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping `Nested` wrappers.
    pub fn root_cause(&self) -> &DeserializeError {
        let mut err = self;
        while let DeserializeError::Nested { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    /// Full location of the failure, e.g. `fields[1].field`.
    pub fn path(&self) -> String {
        let mut parts = Vec::new();
        let mut err = self;
        while let DeserializeError::Nested { path, source } = err {
            parts.push(path.as_str());
            err = source.as_ref();
        }
        parts.join(".")
    }
}

/// Error type for registry construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Filter type '{0}' is already registered")]
    DuplicateTag(String),
}
