//! Endpoint (tenant) repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::error::{classify_write_error, Result, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub config: serde_json::Value,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewEndpoint {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub config: serde_json::Value,
}

pub struct EndpointRepository {
    pool: SqlitePool,
}

impl EndpointRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_endpoint(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Endpoint> {
        let config: String = row.try_get("config")?;
        Ok(Endpoint {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            display_name: row.try_get("display_name")?,
            description: row.try_get("description")?,
            config: serde_json::from_str(&config)?,
            active: row.try_get::<i64, _>("active")? != 0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewEndpoint) -> Result<Endpoint> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let config = serde_json::to_string(&new.config)?;

        sqlx::query(
            r#"INSERT INTO endpoints (id, name, name_lower, display_name, description, config, active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)"#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(new.name.to_lowercase())
        .bind(&new.display_name)
        .bind(&new.description)
        .bind(&config)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, format!("endpoint name '{}' already exists", new.name)))?;

        tracing::debug!(endpoint_id = %id, "endpoint created");

        self.get(&id).await?.ok_or(StoreError::NotFound)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Endpoint>> {
        let row = sqlx::query("SELECT * FROM endpoints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| self.row_to_endpoint(&r)).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Endpoint>> {
        let rows = sqlx::query("SELECT * FROM endpoints ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| self.row_to_endpoint(r)).collect()
    }

    #[tracing::instrument(skip(self, display_name, description, config))]
    pub async fn update(
        &self,
        id: &str,
        display_name: Option<Option<String>>,
        description: Option<Option<String>>,
        config: Option<serde_json::Value>,
        active: Option<bool>,
    ) -> Result<Endpoint> {
        let current = self.get(id).await?.ok_or(StoreError::NotFound)?;
        let now = Utc::now();

        let display_name = display_name.unwrap_or(current.display_name);
        let description = description.unwrap_or(current.description);
        let config = config.unwrap_or(current.config);
        let active = active.unwrap_or(current.active);
        let config_json = serde_json::to_string(&config)?;

        sqlx::query(
            r#"UPDATE endpoints SET display_name = ?, description = ?, config = ?, active = ?, updated_at = ? WHERE id = ?"#,
        )
        .bind(&display_name)
        .bind(&description)
        .bind(&config_json)
        .bind(active as i64)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get(id).await?.ok_or(StoreError::NotFound)
    }

    /// Deletes an Endpoint. Resources and ResourceMembers cascade via foreign
    /// keys; RequestLogs keep their rows with `endpoint_id` set to NULL.
    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM endpoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn stats(&self, id: &str) -> Result<EndpointStats> {
        let users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE endpoint_id = ? AND resource_type = 'User'")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        let groups: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE endpoint_id = ? AND resource_type = 'Group'")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        let requests: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request_logs WHERE endpoint_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(EndpointStats {
            user_count: users,
            group_count: groups,
            request_count: requests,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointStats {
    pub user_count: i64,
    pub group_count: i64,
    pub request_count: i64,
}
