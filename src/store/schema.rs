//! Embedded schema, created idempotently at startup (`CREATE TABLE IF NOT
//! EXISTS`). SQLite has no native case-insensitive text type, so
//! case-insensitively-unique columns (`userName`, `displayName`, `externalId`)
//! carry a generated-at-write lowercase shadow column backed by a real
//! `UNIQUE` index.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS endpoints (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_lower TEXT NOT NULL,
    display_name TEXT,
    description TEXT,
    config TEXT NOT NULL DEFAULT '{}',
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_endpoints_name_lower ON endpoints (name_lower);

CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint_id TEXT NOT NULL REFERENCES endpoints (id) ON DELETE CASCADE,
    resource_type TEXT NOT NULL,
    scim_id TEXT NOT NULL,
    external_id TEXT,
    external_id_lower TEXT,
    user_name TEXT,
    user_name_lower TEXT,
    display_name TEXT,
    display_name_lower TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    payload TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_scim_id
    ON resources (endpoint_id, scim_id);

CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_user_name
    ON resources (endpoint_id, user_name_lower)
    WHERE resource_type = 'User' AND user_name_lower IS NOT NULL;

CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_display_name
    ON resources (endpoint_id, display_name_lower)
    WHERE resource_type = 'Group' AND display_name_lower IS NOT NULL;

CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_external_id
    ON resources (endpoint_id, resource_type, external_id_lower)
    WHERE external_id_lower IS NOT NULL;

CREATE TABLE IF NOT EXISTS resource_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_resource_id INTEGER NOT NULL REFERENCES resources (id) ON DELETE CASCADE,
    member_resource_id INTEGER REFERENCES resources (id) ON DELETE SET NULL,
    value TEXT NOT NULL,
    member_type TEXT,
    display TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_resource_members_group
    ON resource_members (group_resource_id);

CREATE TABLE IF NOT EXISTS request_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint_id TEXT REFERENCES endpoints (id) ON DELETE SET NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER,
    duration_ms INTEGER,
    request_headers TEXT,
    request_body TEXT,
    response_headers TEXT,
    response_body TEXT,
    error_message TEXT,
    error_stack TEXT,
    identifier TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_request_logs_endpoint
    ON request_logs (endpoint_id, created_at);
"#;
