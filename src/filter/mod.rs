//! The query filter expression language.
//!
//! - [`node`] - `QueryFilter` tagged union, compilation to backend predicates
//! - [`registry`] - tag-dispatched decoding from the JSON wire form
//! - [`boundary`] - geo boundary extraction for map visualizations

pub mod boundary;
mod error;
pub mod node;
pub mod registry;

pub use boundary::{extract_boundaries, BoundaryFilters, GeoSelection};
pub use error::{DeserializeError, DeserializeResult, RegistryError};
pub use node::{
    deserialize_optional_filter, CompileOptions, FilterKind, QueryFilter, DEFAULT_FIELD_DIMENSION,
};
pub use registry::{
    Decoder, DeserializeLimits, FilterInput, FilterRegistry, NodeReader, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_WIDTH,
};
