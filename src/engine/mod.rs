//! The SCIM resource engine: per-resource-type create, read, replace, patch,
//! delete, list, and search against the unified Resource table, plus the
//! uniqueness, ETag, and attribute projection contracts that wrap it.

mod crud;
mod list;
mod membership;
mod projection;
mod response;
pub mod tenant_config;

pub use response::{build_document, extract_identifier};

use sqlx::SqlitePool;

use crate::store::endpoints::EndpointRepository;
use crate::store::request_log::RequestLogRepository;
use crate::store::resources::ResourceRepository;

/// Holds the repositories the engine composes operations from. Cheaply
/// cloneable (every field is pool-backed) so handlers can take a thin facade
/// rather than the raw pool.
#[derive(Clone)]
pub struct ResourceEngine {
    pool: SqlitePool,
    pub resources: ResourceRepository,
}

impl ResourceEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            resources: ResourceRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Re-exported for handlers that need direct repository access outside the
/// resource engine's write path (admin stats, discovery).
pub fn endpoints(pool: SqlitePool) -> EndpointRepository {
    EndpointRepository::new(pool)
}

pub fn request_logs(pool: SqlitePool) -> RequestLogRepository {
    RequestLogRepository::new(pool)
}

pub use crud::{create, delete, get, patch, replace, CreateInput};
pub use list::{list, ListParams};
