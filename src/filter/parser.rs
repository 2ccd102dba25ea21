//! Narrow winnow grammar: `<attr-path> eq "<value>"`, full match only.
//!
//! This deliberately does not share a grammar with a fuller filter AST
//! (logical operators, grouping, the rest of the comparison operators).
//! Compound expressions must be rejected, not parsed and then discarded, so
//! the easiest way to guarantee that is to never give the grammar a
//! production for them in the first place.

use winnow::ascii::{multispace0, multispace1, Caseless};
use winnow::combinator::{delimited, repeat};
use winnow::token::{one_of, take_while};
use winnow::Parser;
use winnow::Result as WResult;

use crate::error::ScimError;
use crate::filter::ResourceFilter;

fn attr_path(input: &mut &str) -> WResult<String> {
    let head = one_of(('a'..='z', 'A'..='Z')).parse_next(input)?;
    let rest: String = repeat(
        0..,
        one_of(('a'..='z', 'A'..='Z', '0'..='9', '.', ':', '-', '_')),
    )
    .parse_next(input)?;
    Ok(format!("{head}{rest}"))
}

fn quoted_value(input: &mut &str) -> WResult<String> {
    delimited(
        '"',
        take_while(0.., |c: char| c != '"').map(|s: &str| s.to_string()),
        '"',
    )
    .parse_next(input)
}

fn eq_expr(input: &mut &str) -> WResult<ResourceFilter> {
    let attribute = attr_path.parse_next(input)?;
    multispace1.parse_next(input)?;
    Caseless("eq").parse_next(input)?;
    multispace1.parse_next(input)?;
    let value = quoted_value.parse_next(input)?;
    Ok(ResourceFilter { attribute, value })
}

/// Blanks out quoted string literals so the compound-operator scan below
/// never matches against a value's own contents (a `displayName` of
/// `"Sales and Ops"` must not be mistaken for a logical `and`).
fn blank_quoted_literals(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut in_quotes = false;
    for c in input.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            result.push(' ');
        } else if in_quotes {
            result.push(' ');
        } else {
            result.push(c);
        }
    }
    result
}

/// Rejects any operator keyword this grammar intentionally has no
/// production for, so the error message names the actual problem instead of
/// a generic parse failure.
fn contains_unsupported_construct(input: &str) -> bool {
    let lowered = blank_quoted_literals(input).to_lowercase();
    [" and ", " or ", "not ", "(", ")", " co ", " sw ", " ew ", " ne ", " gt ", " ge ", " lt ", " le ", " pr"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

pub fn parse_eq_filter(input: &str) -> Result<ResourceFilter, ScimError> {
    if contains_unsupported_construct(input) {
        return Err(ScimError::invalid_filter(
            "only a single 'attr eq \"value\"' expression is supported; compound filters are rejected",
        ));
    }

    let mut remaining = input;
    let _ = multispace0.parse_next(&mut remaining);
    let filter = eq_expr
        .parse_next(&mut remaining)
        .map_err(|_| ScimError::invalid_filter(format!("unsupported filter expression: {input}")))?;
    let _ = multispace0.parse_next(&mut remaining);

    if !remaining.is_empty() {
        return Err(ScimError::invalid_filter(format!(
            "unexpected trailing content in filter: {remaining}"
        )));
    }

    Ok(filter)
}
