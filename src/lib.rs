//! A multi-tenant SCIM 2.0 provisioning endpoint (RFC 7643/7644).
//!
//! Requests for each tenant ("endpoint") flow through the auth gate, the
//! tenant router, and the HTTP surface into the resource engine, which is
//! backed by the durable store and composes the filter parser and PATCH
//! path engine. The admin API and audit log sit alongside as operational
//! surfaces; discovery is static, read-only JSON.

pub mod admin;
pub mod audit;
pub mod auth;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod filter;
pub mod http;
pub mod patch;
pub mod schema;
pub mod secret;
pub mod store;
pub mod tenant;

use std::sync::Arc;

use sqlx::SqlitePool;

use config::AppConfig;
use store::endpoints::EndpointRepository;
use store::request_log::RequestLogRepository;

/// Process-wide shared state: one pool, the repositories built over it, and
/// the resolved configuration. Cloned as an `Arc` into every axum handler
/// and middleware layer.
pub struct AppState {
    pub pool: SqlitePool,
    pub endpoints: EndpointRepository,
    pub request_logs: RequestLogRepository,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            endpoints: EndpointRepository::new(pool.clone()),
            request_logs: RequestLogRepository::new(pool.clone()),
            pool,
            config,
        })
    }
}
