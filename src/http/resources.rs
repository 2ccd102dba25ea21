//! SCIM resource handlers: Users and Groups share one implementation
//! parameterized by [`ResourceType`]; the public functions are thin
//! per-type, per-verb wrappers so the router can name a concrete `axum`
//! handler for each route.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::engine::{self, CreateInput, ListParams};
use crate::error::ApiError;
use crate::http::envelope::{self, ListQueryParams, ProjectionParams};
use crate::patch::PatchRequest;
use crate::store::resources::ResourceType;
use crate::tenant::TenantRequestContext;
use crate::AppState;

fn if_match(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok())
}

fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
}

#[tracing::instrument(skip(state, tenant, params, payload), fields(endpoint = %tenant.endpoint_id(), resource_type = %resource_type))]
async fn create(
    state: &Arc<AppState>,
    tenant: &TenantRequestContext,
    resource_type: ResourceType,
    params: &ProjectionParams,
    payload: Value,
) -> Result<Response, ApiError> {
    let created = engine::create(
        &state.pool,
        tenant.endpoint_id(),
        CreateInput {
            resource_type,
            payload,
        },
    )
    .await?;

    let base_url = tenant.resource_base_url(&state.config.api_prefix);
    let document = envelope::project_resource(&created, &base_url, params);
    Ok(envelope::resource_response(StatusCode::CREATED, &created, document))
}

#[tracing::instrument(skip(state, tenant, headers, params), fields(endpoint = %tenant.endpoint_id(), resource_type = %resource_type, scim_id))]
async fn read(
    state: &Arc<AppState>,
    tenant: &TenantRequestContext,
    resource_type: ResourceType,
    scim_id: &str,
    headers: &HeaderMap,
    params: &ProjectionParams,
) -> Result<Response, ApiError> {
    let resource = engine::get(&state.pool, tenant.endpoint_id(), resource_type, scim_id).await?;

    if let Some(tag) = if_none_match(headers) {
        if tag == resource.etag() || tag == "*" {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            if let Ok(etag) = axum::http::HeaderValue::from_str(&resource.etag()) {
                response.headers_mut().insert(header::ETAG, etag);
            }
            return Ok(response);
        }
    }

    let base_url = tenant.resource_base_url(&state.config.api_prefix);
    let document = envelope::project_resource(&resource, &base_url, params);
    Ok(envelope::resource_response(StatusCode::OK, &resource, document))
}

#[tracing::instrument(skip(state, tenant, headers, params, payload), fields(endpoint = %tenant.endpoint_id(), resource_type = %resource_type, scim_id))]
async fn replace(
    state: &Arc<AppState>,
    tenant: &TenantRequestContext,
    resource_type: ResourceType,
    scim_id: &str,
    headers: &HeaderMap,
    params: &ProjectionParams,
    payload: Value,
) -> Result<Response, ApiError> {
    let updated = engine::replace(
        &state.pool,
        tenant.endpoint_id(),
        resource_type,
        scim_id,
        payload,
        if_match(headers),
    )
    .await?;

    let base_url = tenant.resource_base_url(&state.config.api_prefix);
    let document = envelope::project_resource(&updated, &base_url, params);
    Ok(envelope::resource_response(StatusCode::OK, &updated, document))
}

#[tracing::instrument(skip(state, tenant, headers, params, request), fields(endpoint = %tenant.endpoint_id(), resource_type = %resource_type, scim_id))]
async fn patch(
    state: &Arc<AppState>,
    tenant: &TenantRequestContext,
    resource_type: ResourceType,
    scim_id: &str,
    headers: &HeaderMap,
    params: &ProjectionParams,
    request: PatchRequest,
) -> Result<Response, ApiError> {
    let updated = engine::patch(
        &state.pool,
        tenant.endpoint_id(),
        resource_type,
        scim_id,
        &request,
        if_match(headers),
        &tenant.config,
    )
    .await?;

    let base_url = tenant.resource_base_url(&state.config.api_prefix);
    let document = envelope::project_resource(&updated, &base_url, params);
    Ok(envelope::resource_response(StatusCode::OK, &updated, document))
}

#[tracing::instrument(skip(state, tenant, headers), fields(endpoint = %tenant.endpoint_id(), resource_type = %resource_type, scim_id))]
async fn delete(
    state: &Arc<AppState>,
    tenant: &TenantRequestContext,
    resource_type: ResourceType,
    scim_id: &str,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    engine::delete(
        &state.pool,
        tenant.endpoint_id(),
        resource_type,
        scim_id,
        if_match(headers),
    )
    .await?;
    Ok(envelope::no_content())
}

#[tracing::instrument(skip(state, tenant, params), fields(endpoint = %tenant.endpoint_id(), resource_type = %resource_type))]
async fn list(
    state: &Arc<AppState>,
    tenant: &TenantRequestContext,
    resource_type: ResourceType,
    params: &ListQueryParams,
) -> Result<Response, ApiError> {
    let list_params = ListParams {
        filter: params.filter.clone(),
        start_index: params.start_index,
        count: params.count,
    };

    let (resources, mut envelope_body) =
        engine::list(&state.pool, tenant.endpoint_id(), resource_type, &list_params).await?;

    let base_url = tenant.resource_base_url(&state.config.api_prefix);
    let projection = ProjectionParams {
        attributes: params.attributes.clone(),
        excluded_attributes: params.excluded_attributes.clone(),
    };
    let documents: Vec<Value> = resources
        .iter()
        .map(|r| envelope::project_resource(r, &base_url, &projection))
        .collect();

    envelope_body["Resources"] = Value::Array(documents);
    Ok(envelope::scim_json(StatusCode::OK, envelope_body))
}

macro_rules! resource_handlers {
    ($mod_name:ident, $resource_type:expr) => {
        pub mod $mod_name {
            use super::*;

            pub async fn create_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Query(params): Query<ProjectionParams>,
                Json(payload): Json<Value>,
            ) -> Result<Response, ApiError> {
                super::create(&state, &tenant, $resource_type, &params, payload).await
            }

            pub async fn list_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Query(params): Query<ListQueryParams>,
            ) -> Result<Response, ApiError> {
                super::list(&state, &tenant, $resource_type, &params).await
            }

            pub async fn search_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Json(params): Json<ListQueryParams>,
            ) -> Result<Response, ApiError> {
                super::list(&state, &tenant, $resource_type, &params).await
            }

            pub async fn get_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Path((_endpoint_id, scim_id)): Path<(String, String)>,
                headers: HeaderMap,
                Query(params): Query<ProjectionParams>,
            ) -> Result<Response, ApiError> {
                super::read(&state, &tenant, $resource_type, &scim_id, &headers, &params).await
            }

            pub async fn replace_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Path((_endpoint_id, scim_id)): Path<(String, String)>,
                headers: HeaderMap,
                Query(params): Query<ProjectionParams>,
                Json(payload): Json<Value>,
            ) -> Result<Response, ApiError> {
                super::replace(&state, &tenant, $resource_type, &scim_id, &headers, &params, payload).await
            }

            pub async fn patch_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Path((_endpoint_id, scim_id)): Path<(String, String)>,
                headers: HeaderMap,
                Query(params): Query<ProjectionParams>,
                Json(request): Json<PatchRequest>,
            ) -> Result<Response, ApiError> {
                super::patch(&state, &tenant, $resource_type, &scim_id, &headers, &params, request).await
            }

            pub async fn delete_handler(
                State(state): State<Arc<AppState>>,
                tenant: TenantRequestContext,
                Path((_endpoint_id, scim_id)): Path<(String, String)>,
                headers: HeaderMap,
            ) -> Result<Response, ApiError> {
                super::delete(&state, &tenant, $resource_type, &scim_id, &headers).await
            }
        }
    };
}

resource_handlers!(users, ResourceType::User);
resource_handlers!(groups, ResourceType::Group);
