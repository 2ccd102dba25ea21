//! Audit record repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use super::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct RequestLog {
    pub id: i64,
    pub endpoint_id: Option<String>,
    pub method: String,
    pub url: String,
    pub status: Option<i64>,
    pub duration_ms: Option<i64>,
    pub request_headers: Option<String>,
    pub request_body: Option<String>,
    pub response_headers: Option<String>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub error_stack: Option<String>,
    pub identifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NewRequestLog {
    pub endpoint_id: Option<String>,
    pub method: String,
    pub url: String,
    pub status: Option<i64>,
    pub duration_ms: Option<i64>,
    pub request_headers: Option<String>,
    pub request_body: Option<String>,
    pub response_headers: Option<String>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub error_stack: Option<String>,
    pub identifier: Option<String>,
}

#[derive(Debug, Default)]
pub struct RequestLogFilter {
    pub method: Option<String>,
    pub status: Option<i64>,
    pub hide_keepalive: bool,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

fn row_to_log(row: &sqlx::sqlite::SqliteRow) -> Result<RequestLog> {
    Ok(RequestLog {
        id: row.try_get("id")?,
        endpoint_id: row.try_get("endpoint_id")?,
        method: row.try_get("method")?,
        url: row.try_get("url")?,
        status: row.try_get("status")?,
        duration_ms: row.try_get("duration_ms")?,
        request_headers: row.try_get("request_headers")?,
        request_body: row.try_get("request_body")?,
        response_headers: row.try_get("response_headers")?,
        response_body: row.try_get("response_body")?,
        error_message: row.try_get("error_message")?,
        error_stack: row.try_get("error_stack")?,
        identifier: row.try_get("identifier")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct RequestLogRepository {
    pool: SqlitePool,
}

impl RequestLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: NewRequestLog) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO request_logs
               (endpoint_id, method, url, status, duration_ms, request_headers, request_body,
                response_headers, response_body, error_message, error_stack, identifier, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&entry.endpoint_id)
        .bind(&entry.method)
        .bind(&entry.url)
        .bind(entry.status)
        .bind(entry.duration_ms)
        .bind(&entry.request_headers)
        .bind(&entry.request_body)
        .bind(&entry.response_headers)
        .bind(&entry.response_body)
        .bind(&entry.error_message)
        .bind(&entry.error_stack)
        .bind(&entry.identifier)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<RequestLog>> {
        let row = sqlx::query("SELECT * FROM request_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_log).transpose()
    }

    pub async fn list(
        &self,
        endpoint_id: Option<&str>,
        filter: &RequestLogFilter,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<RequestLog>, i64)> {
        let mut clauses = Vec::new();
        if endpoint_id.is_some() {
            clauses.push("endpoint_id = ?".to_string());
        }
        if filter.method.is_some() {
            clauses.push("method = ?".to_string());
        }
        if filter.status.is_some() {
            clauses.push("status = ?".to_string());
        }
        if filter.since.is_some() {
            clauses.push("created_at >= ?".to_string());
        }
        if filter.until.is_some() {
            clauses.push("created_at <= ?".to_string());
        }
        if filter.search.is_some() {
            clauses.push("(url LIKE ? OR identifier LIKE ?)".to_string());
        }
        if filter.hide_keepalive {
            // A pragmatic superset of the real keepalive request signature.
            clauses.push(
                "NOT (method = 'GET' AND identifier IS NULL AND (status IS NULL OR status < 400) AND url LIKE '%filter=%')"
                    .to_string(),
            );
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        macro_rules! bind_common {
            ($q:expr) => {{
                let mut q = $q;
                if let Some(eid) = endpoint_id {
                    q = q.bind(eid);
                }
                if let Some(m) = &filter.method {
                    q = q.bind(m);
                }
                if let Some(s) = filter.status {
                    q = q.bind(s);
                }
                if let Some(since) = filter.since {
                    q = q.bind(since);
                }
                if let Some(until) = filter.until {
                    q = q.bind(until);
                }
                if let Some(search) = &filter.search {
                    let pattern = format!("%{search}%");
                    q = q.bind(pattern.clone()).bind(pattern);
                }
                q
            }};
        }

        let count_sql = format!("SELECT COUNT(*) FROM request_logs{where_clause}");
        let total: i64 = bind_common!(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(&self.pool)
            .await?;

        let page = page.max(1);
        let offset = (page - 1) * page_size;
        let page_sql =
            format!("SELECT * FROM request_logs{where_clause} ORDER BY created_at DESC LIMIT ? OFFSET ?");
        let rows = bind_common!(sqlx::query(&page_sql))
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let logs = rows.iter().map(row_to_log).collect::<Result<Vec<_>>>()?;
        Ok((logs, total))
    }

    pub async fn clear(&self, endpoint_id: Option<&str>) -> Result<u64> {
        let affected = match endpoint_id {
            Some(id) => {
                sqlx::query("DELETE FROM request_logs WHERE endpoint_id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            None => sqlx::query("DELETE FROM request_logs").execute(&self.pool).await?,
        };
        Ok(affected.rows_affected())
    }
}
