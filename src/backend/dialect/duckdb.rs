//! DuckDB dialect.
//!
//! Follows PostgreSQL quoting rules.

use super::helpers;
use super::SqlDialect;

/// DuckDB dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }
}
