//! Permission algebra over dimension value sets.
//!
//! A principal's grant is a [`QueryNeed`]: one [`DimensionFilter`] per
//! dimension. Queries are authorized by deriving the need of their filter
//! and checking that the grant contains it.

mod authorize;
mod dimension;
mod error;
mod need;

pub use authorize::{need_from_filter, Authorizer, GrantProvider};
pub use dimension::{DimensionFilter, DimensionFilterBuilder, DimensionFilterSpec, ValueMode};
pub use error::{PermissionError, PermissionResult};
pub use need::{MissingDimensionPolicy, QueryNeed};
