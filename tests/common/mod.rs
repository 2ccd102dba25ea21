//! Shared scaffolding for the HTTP integration tests: a file-backed SQLite
//! pool per test (through the production `create_pool` bootstrap) and a
//! router built from the production `AppState`, exercised with
//! `tower::ServiceExt::oneshot` the way the pack's own HTTP handler tests do.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use scim_sandbox::config::{AppConfig, Environment};
use scim_sandbox::secret::SecretString;
use scim_sandbox::{store, AppState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::ServiceExt;

pub const SHARED_SECRET: &str = "test-shared-secret";

/// A SQLite DB backed by a real temp file rather than `:memory:`: the pool
/// hands out several connections, and an in-memory SQLite database is not
/// shared across connections without `cache=shared`, so a real file keeps
/// this test harness on the exact code path `create_pool` runs in production.
pub struct TestDb {
    _file: NamedTempFile,
    pub pool: sqlx::SqlitePool,
}

pub async fn test_db() -> TestDb {
    let file = NamedTempFile::new().expect("create temp db file");
    let url = format!("sqlite://{}", file.path().display());
    let pool = store::create_pool(&url).await.expect("bootstrap test pool");
    TestDb { _file: file, pool }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite://unused".to_string(),
        shared_secret: SecretString::new(SHARED_SECRET.to_string()),
        jwt_secret: SecretString::new("test-jwt-secret".to_string()),
        oauth_client_id: None,
        oauth_client_secret: None,
        oauth_client_scopes: None,
        api_prefix: "scim".to_string(),
        port: 0,
        environment: Environment::Development,
        request_timeout: Duration::from_secs(30),
        body_limit_bytes: 5 * 1024 * 1024,
        log_truncate_bytes: 8 * 1024,
        blob_backup_account: None,
        blob_backup_container: None,
    }
}

pub async fn test_app() -> (TestDb, Router) {
    let db = test_db().await;
    let state = AppState::new(db.pool.clone(), test_config());
    let router = scim_sandbox::http::build_router(state);
    (db, router)
}

fn auth_request(method: Method, path: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("Authorization", format!("Bearer {SHARED_SECRET}"))
        .header("Content-Type", "application/scim+json")
        .body(body)
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderSnapshot, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = HeaderSnapshot::from(response.headers());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

/// Just the handful of response headers assertions in these tests care
/// about; cloned out so callers don't have to fight the borrow on `response`.
pub struct HeaderSnapshot {
    pub etag: Option<String>,
    pub location: Option<String>,
}

impl From<&axum::http::HeaderMap> for HeaderSnapshot {
    fn from(headers: &axum::http::HeaderMap) -> Self {
        Self {
            etag: headers.get(axum::http::header::ETAG).and_then(|v| v.to_str().ok()).map(str::to_string),
            location: headers
                .get(axum::http::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

pub async fn authed_get(app: &Router, path: &str) -> (StatusCode, HeaderSnapshot, Value) {
    send(app, auth_request(Method::GET, path, Body::empty())).await
}

pub async fn authed_post(app: &Router, path: &str, body: &Value) -> (StatusCode, HeaderSnapshot, Value) {
    send(app, auth_request(Method::POST, path, Body::from(body.to_string()))).await
}

pub async fn authed_put(app: &Router, path: &str, body: &Value) -> (StatusCode, HeaderSnapshot, Value) {
    send(app, auth_request(Method::PUT, path, Body::from(body.to_string()))).await
}

pub async fn authed_patch(app: &Router, path: &str, body: &Value) -> (StatusCode, HeaderSnapshot, Value) {
    send(app, auth_request(Method::PATCH, path, Body::from(body.to_string()))).await
}

pub async fn authed_delete(app: &Router, path: &str) -> (StatusCode, HeaderSnapshot, Value) {
    send(app, auth_request(Method::DELETE, path, Body::empty())).await
}

/// A request carrying `If-Match`, for the conditional-write scenarios.
pub async fn authed_put_if_match(
    app: &Router,
    path: &str,
    body: &Value,
    if_match: &str,
) -> (StatusCode, HeaderSnapshot, Value) {
    let mut request = auth_request(Method::PUT, path, Body::from(body.to_string()));
    request
        .headers_mut()
        .insert(axum::http::header::IF_MATCH, if_match.parse().unwrap());
    send(app, request).await
}

pub async fn authed_patch_if_match(
    app: &Router,
    path: &str,
    body: &Value,
    if_match: &str,
) -> (StatusCode, HeaderSnapshot, Value) {
    let mut request = auth_request(Method::PATCH, path, Body::from(body.to_string()));
    request
        .headers_mut()
        .insert(axum::http::header::IF_MATCH, if_match.parse().unwrap());
    send(app, request).await
}

pub async fn authed_delete_if_match(
    app: &Router,
    path: &str,
    if_match: &str,
) -> (StatusCode, HeaderSnapshot, Value) {
    let mut request = auth_request(Method::DELETE, path, Body::empty());
    request
        .headers_mut()
        .insert(axum::http::header::IF_MATCH, if_match.parse().unwrap());
    send(app, request).await
}

/// Creates a tenant endpoint through the admin API and returns its id.
pub async fn create_endpoint(app: &Router, name: &str) -> String {
    let (status, _, body) = authed_post(
        app,
        "/scim/admin/endpoints",
        &serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "failed to create endpoint: {body:?}");
    body["id"].as_str().unwrap().to_string()
}

#[allow(dead_code)]
pub fn parse_json<T: DeserializeOwned>(value: &Value) -> T {
    serde_json::from_value(value.clone()).unwrap()
}

#[allow(dead_code)]
pub fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap()
}
