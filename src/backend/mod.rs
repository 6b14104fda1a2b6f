//! Backend query library.
//!
//! The analytics engine's own predicate model, which filter trees compile
//! down to:
//!
//! - [`predicate`] - `Predicate` tree, combinators, native JSON form
//! - [`sql`] - `WHERE`-clause rendering
//! - [`token`] - Token types for SQL rendering
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
mod error;
pub mod predicate;
pub mod sql;
pub mod token;

pub use dialect::{Dialect, SqlDialect};
pub use error::{PredicateError, PredicateResult};
pub use predicate::Predicate;
pub use token::{Token, TokenStream};
