//! Group membership edges.
//!
//! Membership is never mutated in place: replacement is always delete-all
//! plus insert-all inside the same transaction as the owning group's
//! payload update, so a concurrent reader never observes a partial member
//! set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, Sqlite, Transaction};

use super::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct ResourceMember {
    pub id: i64,
    pub group_resource_id: i64,
    pub member_resource_id: Option<i64>,
    pub value: String,
    pub member_type: Option<String>,
    pub display: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewMember {
    pub value: String,
    pub member_resource_id: Option<i64>,
    pub member_type: Option<String>,
    pub display: Option<String>,
}

pub async fn list_for_group_tx(
    tx: &mut Transaction<'_, Sqlite>,
    group_resource_id: i64,
) -> Result<Vec<ResourceMember>> {
    let rows = sqlx::query(
        "SELECT * FROM resource_members WHERE group_resource_id = ? ORDER BY id",
    )
    .bind(group_resource_id)
    .fetch_all(&mut **tx)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ResourceMember {
                id: row.try_get("id")?,
                group_resource_id: row.try_get("group_resource_id")?,
                member_resource_id: row.try_get("member_resource_id")?,
                value: row.try_get("value")?,
                member_type: row.try_get("member_type")?,
                display: row.try_get("display")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Replaces the full member set for a group: delete all existing rows, then
/// insert `members`. Must be called within the same transaction as the
/// group's payload/version update.
pub async fn replace_members_tx(
    tx: &mut Transaction<'_, Sqlite>,
    group_resource_id: i64,
    members: Vec<NewMember>,
) -> Result<()> {
    sqlx::query("DELETE FROM resource_members WHERE group_resource_id = ?")
        .bind(group_resource_id)
        .execute(&mut **tx)
        .await?;

    let now = Utc::now();
    for member in members {
        sqlx::query(
            r#"INSERT INTO resource_members
               (group_resource_id, member_resource_id, value, member_type, display, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(group_resource_id)
        .bind(member.member_resource_id)
        .bind(&member.value)
        .bind(&member.member_type)
        .bind(&member.display)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
