//! List and search: pagination clamp rules and the `ListResponse` envelope.

use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::error::ScimError;
use crate::filter;
use crate::store::resources::{supports_filter_attribute, ResourceRepository, ResourceType};

const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
const DEFAULT_COUNT: i64 = 100;
const MAX_COUNT: i64 = 200;

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filter: Option<String>,
    pub start_index: Option<i64>,
    pub count: Option<i64>,
}

impl ListParams {
    /// Clamps the raw query params: `startIndex` floors at 1, `count`
    /// defaults to 100 and is silently clamped to the `[0, 200]` range.
    fn clamped(&self) -> (i64, i64) {
        let start_index = self.start_index.unwrap_or(1).max(1);
        let count = match self.count {
            Some(c) if c <= 0 => 0,
            Some(c) => c.min(MAX_COUNT),
            None => DEFAULT_COUNT,
        };
        (start_index, count)
    }
}

/// Lists resources for a tenant+type, building the `ListResponse` envelope
/// (resources themselves are the raw stored payload; the caller is
/// responsible for running each one through [`super::build_document`] and
/// projection before this envelope is returned to the client).
pub async fn list(
    pool: &SqlitePool,
    endpoint_id: &str,
    resource_type: ResourceType,
    params: &ListParams,
) -> Result<(Vec<crate::store::resources::Resource>, Value), ScimError> {
    let (start_index, count) = params.clamped();

    let parsed_filter = match &params.filter {
        Some(raw) => filter::parse(raw)?,
        None => None,
    };

    if let Some(f) = &parsed_filter {
        if !supports_filter_attribute(&f.attribute) {
            return Err(ScimError::invalid_filter(format!(
                "attribute '{}' does not support filtering",
                f.attribute
            )));
        }
        if f.attribute.eq_ignore_ascii_case("active") && !matches!(f.value.to_lowercase().as_str(), "true" | "false") {
            return Err(ScimError::invalid_filter(format!(
                "'{}' is not a valid boolean for attribute 'active'",
                f.value
            )));
        }
    }

    let repo = ResourceRepository::new(pool.clone());
    let (resources, total) = repo
        .list(endpoint_id, resource_type, parsed_filter.as_ref(), start_index, count)
        .await?;

    let envelope = json!({
        "schemas": [LIST_RESPONSE_SCHEMA],
        "totalResults": total,
        "startIndex": start_index,
        "itemsPerPage": resources.len(),
    });

    Ok((resources, envelope))
}
