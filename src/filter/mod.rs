//! The filter parser: parses the supported SCIM filter subset into a
//! [`ResourceFilter`] that the store consumes directly as a single-column
//! equality predicate. Compound expressions (`and`, `or`, `not`,
//! parenthesization) and non-`eq` operators are rejected outright rather
//! than partially applied.

mod parser;

use crate::error::ScimError;

/// The parser's entire output shape: a single attribute/value equality pair,
/// consumed directly by `store::resources::ResourceRepository::list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub attribute: String,
    pub value: String,
}

/// Parses a SCIM filter string. Returns `Ok(None)` for an absent/empty
/// filter, `Ok(Some(_))` for a well-formed `attr eq "value"` expression, and
/// `Err(ScimError::InvalidFilter)` for anything else.
pub fn parse(input: &str) -> Result<Option<ResourceFilter>, ScimError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parser::parse_eq_filter(trimmed).map(Some)
}
