//! The admin API: Endpoint CRUD, audit log listing/detail/clear, version
//! metadata, and a read-only projection of the (externally owned) backup
//! subsystem's status.
//!
//! Unlike the SCIM surface, admin responses are plain `application/json`
//! and carry no `ETag`/`Location` interceptor behavior; this surface has no
//! RFC contract to satisfy beyond ordinary CRUD semantics.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::tenant_config::validate_config;
use crate::error::{ApiError, ScimError};
use crate::store::endpoints::NewEndpoint;
use crate::store::request_log::RequestLogFilter;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/endpoints", get(list_endpoints).post(create_endpoint))
        .route(
            "/admin/endpoints/{id}",
            get(get_endpoint).patch(update_endpoint).delete(delete_endpoint),
        )
        .route("/admin/endpoints/{id}/stats", get(endpoint_stats))
        .route("/admin/logs", get(list_logs))
        .route("/admin/logs/{id}", get(get_log))
        .route("/admin/logs/clear", post(clear_logs))
        .route("/admin/version", get(version))
        .route("/admin/backup/stats", get(backup_stats))
}

/// Endpoint `name` is a URL path segment: restrict it to a charset that
/// never needs escaping there.
fn validate_name(name: &str) -> Result<(), ScimError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(ScimError::InvalidValue {
            detail: "endpoint name must match [A-Za-z0-9_-]+".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEndpointRequest {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    config: Value,
}

#[tracing::instrument(skip(state, body), fields(name = %body.name))]
async fn create_endpoint(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEndpointRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_name(&body.name)?;
    validate_config(&body.config)?;

    let created = state
        .endpoints
        .create(NewEndpoint {
            name: body.name,
            display_name: body.display_name,
            description: body.description,
            config: body.config,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

#[tracing::instrument(skip(state))]
async fn list_endpoints(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let endpoints = state.endpoints.list().await.map_err(ScimError::from)?;
    Ok(Json(endpoints))
}

#[tracing::instrument(skip(state))]
async fn get_endpoint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let endpoint = state
        .endpoints
        .get(&id)
        .await
        .map_err(ScimError::from)?
        .ok_or_else(|| ScimError::no_target(format!("no endpoint '{id}'")))?;
    Ok(Json(endpoint))
}

/// Admin update is a flat JSON merge, not a SCIM PatchOp: a present key
/// (including an explicit `null`) sets that field, an absent key leaves it
/// unchanged (e.g. `PATCH /admin/endpoints/E {active:false}` deactivates an
/// endpoint without touching its other fields).
#[tracing::instrument(skip(state, body))]
async fn update_endpoint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ScimError::invalid_syntax("request body must be a JSON object"))?;

    let display_name = obj.get("displayName").map(|v| v.as_str().map(str::to_string));
    let description = obj.get("description").map(|v| v.as_str().map(str::to_string));

    let config = match obj.get("config") {
        None => None,
        Some(c) => {
            validate_config(c)?;
            Some(c.clone())
        }
    };

    let active = match obj.get("active") {
        None => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            return Err(ScimError::InvalidValue {
                detail: "active must be a boolean".to_string(),
            }
            .into())
        }
    };

    let updated = state
        .endpoints
        .update(&id, display_name, description, config, active)
        .await
        .map_err(|e| match e {
            crate::store::StoreError::NotFound => ScimError::no_target(format!("no endpoint '{id}'")),
            other => ScimError::from(other),
        })?;

    Ok(Json(updated))
}

#[tracing::instrument(skip(state))]
async fn delete_endpoint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.endpoints.delete(&id).await.map_err(ScimError::from)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
async fn endpoint_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .endpoints
        .get(&id)
        .await
        .map_err(ScimError::from)?
        .ok_or_else(|| ScimError::no_target(format!("no endpoint '{id}'")))?;
    let stats = state.endpoints.stats(&id).await.map_err(ScimError::from)?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    hide_keepalive: Option<bool>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    since: Option<DateTime<Utc>>,
    #[serde(default)]
    until: Option<DateTime<Utc>>,
    #[serde(default)]
    endpoint_id: Option<String>,
}

#[tracing::instrument(skip(state, query))]
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = RequestLogFilter {
        method: query.method,
        status: query.status,
        hide_keepalive: query.hide_keepalive.unwrap_or(false),
        search: query.search,
        since: query.since,
        until: query.until,
    };

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(50).clamp(1, 500);

    let (logs, total) = state
        .request_logs
        .list(query.endpoint_id.as_deref(), &filter, page, page_size)
        .await
        .map_err(ScimError::from)?;

    Ok(Json(json!({
        "page": page,
        "pageSize": page_size,
        "totalResults": total,
        "logs": logs,
    })))
}

#[tracing::instrument(skip(state))]
async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let log = state
        .request_logs
        .get(id)
        .await
        .map_err(ScimError::from)?
        .ok_or_else(|| ScimError::no_target(format!("no log entry '{id}'")))?;
    Ok(Json(log))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearLogsQuery {
    #[serde(default)]
    endpoint_id: Option<String>,
}

#[tracing::instrument(skip(state, query))]
async fn clear_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClearLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = state
        .request_logs
        .clear(query.endpoint_id.as_deref())
        .await
        .map_err(ScimError::from)?;
    Ok(Json(json!({ "cleared": cleared })))
}

async fn version() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Informational projection of the externally-owned backup subsystem's
/// configuration; this crate neither runs nor schedules backups, it only
/// reports whether one is configured.
async fn backup_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let configured = state.config.blob_backup_account.is_some() && state.config.blob_backup_container.is_some();
    Json(json!({
        "configured": configured,
        "account": state.config.blob_backup_account,
        "container": state.config.blob_backup_container,
        "note": "backup execution is handled by an external subsystem; this endpoint only reports configuration status",
    }))
}
