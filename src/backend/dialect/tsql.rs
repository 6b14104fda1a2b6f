//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! Differences from ANSI that matter for predicates:
//! - Square bracket identifier quoting (`[name]`)
//! - No boolean literal usable as a predicate (`1 = 1` instead of `TRUE`)
//! - N'...' prefix for Unicode strings

use super::helpers;
use super::SqlDialect;

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        if !s.is_ascii() {
            helpers::quote_string_unicode(s)
        } else {
            helpers::quote_string_single(s)
        }
    }

    fn true_predicate(&self) -> &'static str {
        "1 = 1"
    }

    fn false_predicate(&self) -> &'static str {
        "1 = 0"
    }
}
