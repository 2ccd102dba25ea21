//! Router assembly: mounts tenant-scoped SCIM routes, discovery, admin, and
//! health under the configured API prefix, applies the auth gate and audit
//! middleware, and bounds every request with a body-size limit and timeout.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::http::resources::{groups, users};
use crate::{admin, audit, auth, discovery, AppState};

const ENDPOINT_USERS: &str = "/endpoints/{endpoint_id}/Users";
const ENDPOINT_USER: &str = "/endpoints/{endpoint_id}/Users/{scim_id}";
const ENDPOINT_GROUPS: &str = "/endpoints/{endpoint_id}/Groups";
const ENDPOINT_GROUP: &str = "/endpoints/{endpoint_id}/Groups/{scim_id}";

fn scim_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ENDPOINT_USERS,
            get(users::list_handler).post(users::create_handler),
        )
        .route(&format!("{ENDPOINT_USERS}/.search"), post(users::search_handler))
        .route(
            ENDPOINT_USER,
            get(users::get_handler)
                .put(users::replace_handler)
                .patch(users::patch_handler)
                .delete(users::delete_handler),
        )
        .route(
            ENDPOINT_GROUPS,
            get(groups::list_handler).post(groups::create_handler),
        )
        .route(&format!("{ENDPOINT_GROUPS}/.search"), post(groups::search_handler))
        .route(
            ENDPOINT_GROUP,
            get(groups::get_handler)
                .put(groups::replace_handler)
                .patch(groups::patch_handler)
                .delete(groups::delete_handler),
        )
}

fn discovery_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/endpoints/{endpoint_id}/ServiceProviderConfig",
            get(discovery::service_provider_config_handler),
        )
        .route(
            "/endpoints/{endpoint_id}/ResourceTypes",
            get(discovery::resource_types_handler),
        )
        .route(
            "/endpoints/{endpoint_id}/Schemas",
            get(discovery::schemas_handler),
        )
}

/// Builds the full application router. `api_prefix` and `/v2` are both
/// accepted on every tenant route: rather than a separate path-rewriting
/// layer collapsing `/{prefix}/v2/...` to `/{prefix}/...`, both forms are
/// registered directly in the route table, since axum has no notion of
/// mutating the matched path before routing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let prefix = format!("/{}", state.config.api_prefix.trim_matches('/'));
    let v2_prefix = format!("{prefix}/v2");

    let protected = scim_routes()
        .merge(admin::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    let api = Router::new()
        .merge(protected)
        .merge(discovery_routes())
        .layer(middleware::from_fn_with_state(state.clone(), audit::record_request));

    Router::new()
        .route("/healthz", get(health))
        .nest(&prefix, api.clone())
        .nest(&v2_prefix, api)
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
