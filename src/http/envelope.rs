//! Shared response shaping: every SCIM response, including error and
//! discovery responses, carries
//! `Content-Type: application/scim+json; charset=utf-8`; single-resource
//! responses additionally carry `ETag`, and `201 Created` responses carry
//! `Location`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::{self, projection};
use crate::store::resources::Resource;

pub const SCIM_CONTENT_TYPE: &str = "application/scim+json; charset=utf-8";

/// Query params accepted on every SCIM read: attribute projection.
/// `attributes` wins over `excludedAttributes` on conflict.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionParams {
    pub attributes: Option<String>,
    pub excluded_attributes: Option<String>,
}

/// Query params accepted on List (GET) and folded from the Search (POST
/// `.search`) request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQueryParams {
    pub filter: Option<String>,
    pub start_index: Option<i64>,
    pub count: Option<i64>,
    pub attributes: Option<String>,
    pub excluded_attributes: Option<String>,
    /// Accepted but a no-op: sort is advertised as unsupported.
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

pub(crate) fn with_scim_content_type(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(SCIM_CONTENT_TYPE),
    );
    response
}

/// Builds the wire document for a resource, applying attribute projection.
pub fn project_resource(resource: &Resource, base_url: &str, params: &ProjectionParams) -> Value {
    let body = engine::build_document(resource, base_url);
    projection::project(
        &body,
        params.attributes.as_deref(),
        params.excluded_attributes.as_deref(),
    )
}

/// Wraps a single-resource document, attaching `ETag` and (for `201`) the
/// `Location` header taken from `meta.location`.
pub fn resource_response(status: StatusCode, resource: &Resource, document: Value) -> Response {
    let location = (status == StatusCode::CREATED)
        .then(|| {
            document
                .get("meta")
                .and_then(|m| m.get("location"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .flatten();

    let mut response = (status, Json(document)).into_response();

    if let Ok(etag) = HeaderValue::from_str(&resource.etag()) {
        response.headers_mut().insert(header::ETAG, etag);
    }

    if let Some(location) = location {
        if let Ok(value) = HeaderValue::from_str(&location) {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }

    with_scim_content_type(response)
}

pub fn scim_json(status: StatusCode, body: Value) -> Response {
    with_scim_content_type((status, Json(body)).into_response())
}

pub fn no_content() -> Response {
    with_scim_content_type(StatusCode::NO_CONTENT.into_response())
}
