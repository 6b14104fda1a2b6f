//! # Prism
//!
//! A composable query-filter language with a permission algebra over
//! dimensional data.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          JSON wire form ({"type": "AND", ...})           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter::FilterRegistry]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  QueryFilter tree                        │
//! └─────────────────────────────────────────────────────────┘
//!              │                              │
//!              ▼ [compile]                    ▼ [permission]
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │  backend::Predicate       │  │  QueryNeed vs. grant     │
//! │  (native JSON / SQL)      │  │  (DimensionFilter sets)  │
//! └───────────────────────────┘  └──────────────────────────┘
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod filter;
pub mod permission;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::backend::{Dialect, Predicate, SqlDialect};
    pub use crate::filter::{
        extract_boundaries, BoundaryFilters, CompileOptions, DeserializeError, DeserializeLimits,
        FilterKind, FilterRegistry, QueryFilter,
    };
    pub use crate::permission::{
        need_from_filter, Authorizer, DimensionFilter, MissingDimensionPolicy, QueryNeed,
    };
}

// Also export at crate root for convenience
pub use backend::{Dialect, Predicate};
pub use filter::{FilterRegistry, QueryFilter};
pub use permission::{Authorizer, DimensionFilter, QueryNeed};
