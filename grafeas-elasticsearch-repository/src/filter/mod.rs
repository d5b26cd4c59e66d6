//! Filter expression translation.
//!
//! Callers filter list operations with a small expression language: string,
//! integer, unsigned, double and boolean literals, identifiers, field
//! selection (`a.b.c`), `&&`, `||`, `==`, `!=`, `<`, `<=`, `>`, `>=`, and the
//! functions `x.startsWith(y)`, `x.contains(y)` and `path.nestedFilter(expr)`.
//! [`Filterer`] compiles such an expression into a [`Query`] tree.

mod lexer;
mod parser;
mod translate;

pub use parser::{BinaryOp, Expr, Literal};
pub use translate::escape_query_string;

use crate::dsl::Query;
use crate::errors::FilterError;

/// Compiles filter expressions into engine queries.
///
/// Stateless and cheap to copy; it performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filterer;

impl Filterer {
    pub fn new() -> Self {
        Self
    }

    /// Compile `filter` into a query.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - If the filter is empty, meaning every document matches
    /// * `Ok(Some(Query))` - The translated query
    /// * `Err(FilterError)` - If the filter cannot be parsed or translated
    pub fn parse_expression(&self, filter: &str) -> Result<Option<Query>, FilterError> {
        if filter.trim().is_empty() {
            return Ok(None);
        }
        let expr = parser::parse(filter)?;
        translate::translate(&expr, "").map(Some)
    }
}
