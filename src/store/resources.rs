//! Resource repository: the unified User/Group table.
//!
//! Simple reads/writes go through [`ResourceRepository`], which owns a pool.
//! Operations that must be atomic with a member-set replacement (group PATCH
//! add/remove/replace) use the `_tx` free functions directly against a
//! `Transaction`, so the engine layer can compose a resource update and a
//! member replacement into one commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::fmt;

use super::error::{classify_write_error, Result, StoreError};
use crate::filter::ResourceFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    User,
    Group,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceType::User => "User",
            ResourceType::Group => "Group",
        })
    }
}

impl std::str::FromStr for ResourceType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "User" => Ok(ResourceType::User),
            "Group" => Ok(ResourceType::Group),
            other => Err(StoreError::Internal(format!("unknown resource type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub endpoint_id: String,
    pub resource_type: ResourceType,
    pub scim_id: String,
    pub external_id: Option<String>,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub active: bool,
    pub payload: serde_json::Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// `meta.version`: a weak ETag, the literal string `W/"<updatedAt>"`.
    pub fn etag(&self) -> String {
        format!("W/\"{}\"", self.updated_at.to_rfc3339())
    }
}

pub struct NewResource {
    pub endpoint_id: String,
    pub resource_type: ResourceType,
    pub scim_id: String,
    pub external_id: Option<String>,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub active: bool,
    pub payload: serde_json::Value,
}

fn row_to_resource(row: &SqliteRow) -> Result<Resource> {
    let payload: String = row.try_get("payload")?;
    let resource_type: String = row.try_get("resource_type")?;
    Ok(Resource {
        id: row.try_get("id")?,
        endpoint_id: row.try_get("endpoint_id")?,
        resource_type: resource_type.parse()?,
        scim_id: row.try_get("scim_id")?,
        external_id: row.try_get("external_id")?,
        user_name: row.try_get("user_name")?,
        display_name: row.try_get("display_name")?,
        active: row.try_get::<i64, _>("active")? != 0,
        payload: serde_json::from_str(&payload)?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Looks up the scimId of the resource already holding `value` in `column`,
/// so a uniqueness conflict can name the resource it conflicts with rather
/// than only the value in question. `exclude_id` keeps a self-update from
/// matching its own row.
async fn conflicting_scim_id(
    tx: &mut Transaction<'_, Sqlite>,
    endpoint_id: &str,
    resource_type: ResourceType,
    column: &str,
    value: &str,
    exclude_id: Option<i64>,
) -> Option<String> {
    let sql = match exclude_id {
        Some(_) => format!(
            "SELECT scim_id FROM resources WHERE endpoint_id = ? AND resource_type = ? AND {column} = ? AND id != ?"
        ),
        None => format!("SELECT scim_id FROM resources WHERE endpoint_id = ? AND resource_type = ? AND {column} = ?"),
    };
    let mut query = sqlx::query_scalar::<_, String>(&sql)
        .bind(endpoint_id)
        .bind(resource_type.to_string())
        .bind(value);
    if let Some(id) = exclude_id {
        query = query.bind(id);
    }
    query.fetch_optional(&mut **tx).await.ok().flatten()
}

/// Builds the `detail` for a 409 uniqueness conflict, naming the scimId of
/// the resource that already holds the colliding value.
async fn uniqueness_detail(
    tx: &mut Transaction<'_, Sqlite>,
    endpoint_id: &str,
    resource_type: ResourceType,
    user_name: Option<&str>,
    display_name: Option<&str>,
    exclude_id: Option<i64>,
) -> String {
    let (attr, column, value) = match resource_type {
        ResourceType::User => ("userName", "user_name_lower", user_name.unwrap_or("").to_lowercase()),
        ResourceType::Group => (
            "displayName",
            "display_name_lower",
            display_name.unwrap_or("").to_lowercase(),
        ),
    };
    match conflicting_scim_id(tx, endpoint_id, resource_type, column, &value, exclude_id).await {
        Some(scim_id) => format!("{attr} is already in use by resource '{scim_id}'"),
        None => format!("{attr} value is already in use"),
    }
}

pub async fn create_tx(tx: &mut Transaction<'_, Sqlite>, new: NewResource) -> Result<Resource> {
    let now = Utc::now();
    let payload = serde_json::to_string(&new.payload)?;

    let insert_result = sqlx::query(
        r#"INSERT INTO resources
           (endpoint_id, resource_type, scim_id, external_id, external_id_lower,
            user_name, user_name_lower, display_name, display_name_lower,
            active, payload, version, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)"#,
    )
    .bind(&new.endpoint_id)
    .bind(new.resource_type.to_string())
    .bind(&new.scim_id)
    .bind(&new.external_id)
    .bind(new.external_id.as_ref().map(|s| s.to_lowercase()))
    .bind(&new.user_name)
    .bind(new.user_name.as_ref().map(|s| s.to_lowercase()))
    .bind(&new.display_name)
    .bind(new.display_name.as_ref().map(|s| s.to_lowercase()))
    .bind(new.active as i64)
    .bind(&payload)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await;

    let id = match insert_result {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            let detail = uniqueness_detail(
                tx,
                &new.endpoint_id,
                new.resource_type,
                new.user_name.as_deref(),
                new.display_name.as_deref(),
                None,
            )
            .await;
            return Err(classify_write_error(e, detail));
        }
    };

    get_by_id_tx(tx, id).await?.ok_or(StoreError::NotFound)
}

pub async fn get_by_id_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<Option<Resource>> {
    let row = sqlx::query("SELECT * FROM resources WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.as_ref().map(row_to_resource).transpose()
}

/// Updates a resource's client-visible fields and bumps `version`, keyed on
/// `expected_version` so a concurrent writer loses the race cleanly (the
/// engine layer is responsible for having already checked `If-Match` against
/// the value it read before calling this).
#[allow(clippy::too_many_arguments)]
pub async fn update_tx(
    tx: &mut Transaction<'_, Sqlite>,
    endpoint_id: &str,
    resource_type: ResourceType,
    id: i64,
    external_id: Option<String>,
    user_name: Option<String>,
    display_name: Option<String>,
    active: bool,
    payload: serde_json::Value,
    expected_version: i64,
) -> Result<Resource> {
    let now = Utc::now();
    let payload_str = serde_json::to_string(&payload)?;

    let update_result = sqlx::query(
        r#"UPDATE resources SET
             external_id = ?, external_id_lower = ?,
             user_name = ?, user_name_lower = ?,
             display_name = ?, display_name_lower = ?,
             active = ?, payload = ?, version = version + 1, updated_at = ?
           WHERE id = ? AND version = ?"#,
    )
    .bind(&external_id)
    .bind(external_id.as_ref().map(|s| s.to_lowercase()))
    .bind(&user_name)
    .bind(user_name.as_ref().map(|s| s.to_lowercase()))
    .bind(&display_name)
    .bind(display_name.as_ref().map(|s| s.to_lowercase()))
    .bind(active as i64)
    .bind(&payload_str)
    .bind(now)
    .bind(id)
    .bind(expected_version)
    .execute(&mut **tx)
    .await;

    let affected = match update_result {
        Ok(result) => result.rows_affected(),
        Err(e) => {
            let detail = uniqueness_detail(
                tx,
                endpoint_id,
                resource_type,
                user_name.as_deref(),
                display_name.as_deref(),
                Some(id),
            )
            .await;
            return Err(classify_write_error(e, detail));
        }
    };

    if affected == 0 {
        return Err(StoreError::NotFound);
    }

    get_by_id_tx(tx, id).await?.ok_or(StoreError::NotFound)
}

/// Looks up a resource by its tenant-scoped `scim_id` inside an existing
/// transaction, used by group-membership resolution so a member `value`
/// can be resolved to an internal resource id within the same transaction
/// as the owning group's update.
pub async fn get_by_scim_id_any_type_tx(
    tx: &mut Transaction<'_, Sqlite>,
    endpoint_id: &str,
    resource_type: ResourceType,
    scim_id: &str,
) -> Result<Option<Resource>> {
    let row = sqlx::query("SELECT * FROM resources WHERE endpoint_id = ? AND resource_type = ? AND scim_id = ?")
        .bind(endpoint_id)
        .bind(resource_type.to_string())
        .bind(scim_id)
        .fetch_optional(&mut **tx)
        .await?;
    row.as_ref().map(row_to_resource).transpose()
}

pub async fn delete_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM resources WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub struct ResourceRepository {
    pool: SqlitePool,
}

impl ResourceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_by_scim_id(
        &self,
        endpoint_id: &str,
        resource_type: ResourceType,
        scim_id: &str,
    ) -> Result<Option<Resource>> {
        let row = sqlx::query(
            "SELECT * FROM resources WHERE endpoint_id = ? AND resource_type = ? AND scim_id = ?",
        )
        .bind(endpoint_id)
        .bind(resource_type.to_string())
        .bind(scim_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_resource).transpose()
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Resource>> {
        let row = sqlx::query("SELECT * FROM resources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_resource).transpose()
    }

    /// Lists resources for a tenant+type with pagination and an optional
    /// single-attribute equality filter. Returns `(page, total_matching)`.
    pub async fn list(
        &self,
        endpoint_id: &str,
        resource_type: ResourceType,
        filter: Option<&ResourceFilter>,
        start_index: i64,
        count: i64,
    ) -> Result<(Vec<Resource>, i64)> {
        let start_index = start_index.max(1);
        let offset = start_index - 1;

        let (predicate, bind_value) = match filter {
            Some(f) => {
                let column = filter_column(&f.attribute)?;
                (
                    format!(" AND {column} = ?"),
                    Some(FilterBindValue::for_column(column, &f.value)?),
                )
            }
            None => (String::new(), None),
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM resources WHERE endpoint_id = ? AND resource_type = ?{predicate}"
        );
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(endpoint_id)
            .bind(resource_type.to_string());
        count_query = match &bind_value {
            Some(FilterBindValue::Text(v)) => count_query.bind(v.clone()),
            Some(FilterBindValue::Bool(v)) => count_query.bind(*v as i64),
            None => count_query,
        };
        let total = count_query.fetch_one(&self.pool).await?;

        let page_sql = format!(
            "SELECT * FROM resources WHERE endpoint_id = ? AND resource_type = ?{predicate} ORDER BY id LIMIT ? OFFSET ?"
        );
        let mut page_query = sqlx::query(&page_sql)
            .bind(endpoint_id)
            .bind(resource_type.to_string());
        page_query = match &bind_value {
            Some(FilterBindValue::Text(v)) => page_query.bind(v.clone()),
            Some(FilterBindValue::Bool(v)) => page_query.bind(*v as i64),
            None => page_query,
        };
        let rows = page_query
            .bind(count)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let resources = rows.iter().map(row_to_resource).collect::<Result<Vec<_>>>()?;
        Ok((resources, total))
    }
}

/// A filter value coerced to the storage type its target column expects:
/// the `*_lower` shadow columns compare as lowercased text, `active` compares
/// as the integer SQLite actually stores (an unconverted `"true"`/`"false"`
/// string never matches an INTEGER-affinity column).
enum FilterBindValue {
    Text(String),
    Bool(bool),
}

impl FilterBindValue {
    fn for_column(column: &str, raw: &str) -> Result<Self> {
        if column == "active" {
            match raw.to_lowercase().as_str() {
                "true" => Ok(FilterBindValue::Bool(true)),
                "false" => Ok(FilterBindValue::Bool(false)),
                other => Err(StoreError::Internal(format!(
                    "'{other}' is not a valid boolean for attribute 'active'"
                ))),
            }
        } else {
            Ok(FilterBindValue::Text(raw.to_lowercase()))
        }
    }
}

/// Reports whether an attribute name resolves to a storage column, so
/// callers above the store (which do not otherwise know the column mapping)
/// can reject an unfilterable attribute as `invalidFilter` before ever
/// reaching the database.
pub fn supports_filter_attribute(attr: &str) -> bool {
    filter_column(attr).is_ok()
}

/// Maps a filter attribute name (case-insensitively) to its storage column.
/// The lowercased shadow columns are used directly so the compare stays
/// case-insensitive without a SQL `lower()` call per row.
fn filter_column(attr: &str) -> Result<&'static str> {
    match attr.to_lowercase().as_str() {
        "username" => Ok("user_name_lower"),
        "displayname" => Ok("display_name_lower"),
        "externalid" => Ok("external_id_lower"),
        "active" => Ok("active"),
        "id" => Ok("scim_id"),
        other => Err(StoreError::Internal(format!(
            "attribute '{other}' has no storage-level column"
        ))),
    }
}
