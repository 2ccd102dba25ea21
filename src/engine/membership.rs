//! Group membership synchronization.
//!
//! After a Group's payload is computed (by PUT or PATCH), the `members`
//! array is the single source of truth; this module re-derives the
//! `resource_members` rows from it inside the same transaction as the
//! payload/version update, so a concurrent reader never observes a partial
//! member set.

use serde_json::Value;
use sqlx::{Sqlite, Transaction};

use crate::store::members::NewMember;
use crate::store::resources::ResourceType;
use crate::store::{self, StoreError};

/// Reads the `members` array (if any) out of a Group payload and resolves
/// each `value` to an internal resource id on a best-effort basis; unresolved
/// members are persisted with `member_resource_id = null`.
pub async fn sync_members_tx(
    tx: &mut Transaction<'_, Sqlite>,
    endpoint_id: &str,
    group_resource_id: i64,
    payload: &Value,
) -> Result<(), StoreError> {
    let members = payload
        .as_object()
        .and_then(|o| o.iter().find(|(k, _)| k.eq_ignore_ascii_case("members")))
        .and_then(|(_, v)| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut new_members = Vec::with_capacity(members.len());
    for member in &members {
        let Some(obj) = member.as_object() else { continue };
        let Some(value) = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("value"))
            .and_then(|(_, v)| v.as_str())
        else {
            continue;
        };

        let member_resource_id = store::resources::get_by_scim_id_any_type_tx(tx, endpoint_id, ResourceType::User, value)
            .await?
            .map(|r| r.id);

        let member_type = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("type"))
            .and_then(|(_, v)| v.as_str())
            .map(str::to_string);
        let display = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("display"))
            .and_then(|(_, v)| v.as_str())
            .map(str::to_string);

        new_members.push(NewMember {
            value: value.to_string(),
            member_resource_id,
            member_type,
            display,
        });
    }

    store::members::replace_members_tx(tx, group_resource_id, new_members).await
}
