//! The PATCH path grammar: simple, value-filter, and URN-extension paths.
//!
//! `PatchPath` is the complete set of shapes the engine accepts, represented
//! as a tagged sum rather than a parsed-then-reinterpreted string.

use crate::error::ScimError;

/// Schema extension URNs this engine recognizes in a PATCH path prefix.
/// Matched case-insensitively; only the Enterprise User extension is a
/// standard RFC 7643 extension, so it is the only entry today, but the list
/// is where a deployment would register more.
pub const KNOWN_EXTENSION_URNS: &[&str] =
    &["urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchPath {
    /// No `path` on the operation; value is merged into the resource root.
    NoPath,
    /// A dotted attribute path, e.g. `displayName`, `name.givenName`.
    Simple(String),
    /// `<attr>[<filterAttr> <op> "<value>"](.<subAttr>)?`
    ValueFilter {
        attr: String,
        filter_attr: String,
        op: String,
        value: String,
        sub_attr: Option<String>,
    },
    /// `<knownExtensionURN>:<attrPath>`. `urn` is the canonical form from
    /// [`KNOWN_EXTENSION_URNS`]; `attr_path` preserves the caller's casing.
    Extension { urn: &'static str, attr_path: String },
}

pub fn parse_path(raw: Option<&str>) -> Result<PatchPath, ScimError> {
    let Some(raw) = raw else {
        return Ok(PatchPath::NoPath);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(PatchPath::NoPath);
    }

    if let Some(path) = try_parse_extension(trimmed)? {
        return Ok(path);
    }

    if trimmed.to_lowercase().starts_with("urn:") {
        return Err(ScimError::invalid_path(format!(
            "unknown or unsupported schema extension in path: {trimmed}"
        )));
    }

    if let Some(bracket_start) = trimmed.find('[') {
        return parse_value_filter(trimmed, bracket_start);
    }

    if trimmed.contains('[') || trimmed.contains(']') {
        return Err(ScimError::invalid_path(format!("malformed path: {trimmed}")));
    }

    Ok(PatchPath::Simple(trimmed.to_string()))
}

fn try_parse_extension(trimmed: &str) -> Result<Option<PatchPath>, ScimError> {
    for urn in KNOWN_EXTENSION_URNS {
        if trimmed.len() > urn.len()
            && trimmed[..urn.len()].eq_ignore_ascii_case(urn)
            && trimmed.as_bytes()[urn.len()] == b':'
        {
            let attr_path = trimmed[urn.len() + 1..].to_string();
            if attr_path.is_empty() {
                return Err(ScimError::invalid_path(
                    "extension path is missing a trailing attribute",
                ));
            }
            return Ok(Some(PatchPath::Extension { urn, attr_path }));
        }
    }
    Ok(None)
}

fn parse_value_filter(trimmed: &str, bracket_start: usize) -> Result<PatchPath, ScimError> {
    let attr = trimmed[..bracket_start].to_string();
    if attr.is_empty() {
        return Err(ScimError::invalid_path("value-filter path is missing its attribute name"));
    }

    let rest = &trimmed[bracket_start..];
    let close = rest
        .find(']')
        .ok_or_else(|| ScimError::invalid_path(format!("unterminated '[' in path: {trimmed}")))?;
    let inner = &rest[1..close];
    let after = &rest[close + 1..];

    let sub_attr = if after.is_empty() {
        None
    } else if let Some(dotted) = after.strip_prefix('.') {
        if dotted.is_empty() || dotted.contains(['[', ']']) {
            return Err(ScimError::invalid_path(format!("malformed sub-attribute in path: {trimmed}")));
        }
        Some(dotted.to_string())
    } else {
        return Err(ScimError::invalid_path(format!(
            "unexpected trailing content after ']' in path: {trimmed}"
        )));
    };

    let (filter_attr, op, value) = parse_filter_inner(inner)
        .map_err(|_| ScimError::invalid_path(format!("malformed filter expression in path: [{inner}]")))?;

    Ok(PatchPath::ValueFilter {
        attr,
        filter_attr,
        op,
        value,
        sub_attr,
    })
}

/// Parses `filterAttr op "value"` (or an unquoted value) inside the brackets.
/// Every operator keyword is accepted here and normalized to lowercase;
/// [`super::apply`] is responsible for only treating `eq` as fully functional
/// and falling back to strict string equality for the rest.
fn parse_filter_inner(inner: &str) -> Result<(String, String, String), ()> {
    let inner = inner.trim();
    let mut parts = inner.splitn(2, char::is_whitespace);
    let attr = parts.next().filter(|s| !s.is_empty()).ok_or(())?.to_string();
    let rest = parts.next().ok_or(())?.trim_start();

    let mut parts2 = rest.splitn(2, char::is_whitespace);
    let op = parts2.next().filter(|s| !s.is_empty()).ok_or(())?.to_lowercase();
    let value_raw = parts2.next().ok_or(())?.trim();

    let value = if value_raw.len() >= 2 && value_raw.starts_with('"') && value_raw.ends_with('"') {
        value_raw[1..value_raw.len() - 1].to_string()
    } else if value_raw.is_empty() {
        return Err(());
    } else {
        value_raw.to_string()
    };

    Ok((attr, op, value))
}
