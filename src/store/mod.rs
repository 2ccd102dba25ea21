//! The durable store: typed persistence for Endpoints, Resources, Members,
//! and RequestLogs, with tenant-scoped queries and cascading deletes
//! expressed as SQLite foreign keys.

mod error;
mod schema;

pub mod endpoints;
pub mod members;
pub mod pool;
pub mod request_log;
pub mod resources;

pub use error::{classify_write_error, StoreError};
pub use pool::create_pool;
