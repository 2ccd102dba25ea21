//! Create, read, replace, patch, and delete for SCIM resources.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::engine::tenant_config::TenantConfig;
use crate::engine::{membership, response};
use crate::error::ScimError;
use crate::patch::{apply_op, parse_path, PatchOpKind, PatchOperation, PatchPath, PatchRequest, PATCH_OP_SCHEMA};
use crate::store::resources::{self, NewResource, Resource, ResourceType};
use crate::store::StoreError;

fn find_str(obj: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.as_str())
        .map(str::to_string)
}

fn find_bool(obj: &serde_json::Map<String, Value>, name: &str) -> Option<bool> {
    obj.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).and_then(|(_, v)| v.as_bool())
}

fn has_schema(payload: &Value, expected: &str) -> bool {
    payload
        .get("schemas")
        .or_else(|| payload.as_object().and_then(|o| find_str(o, "schemas").map(|_| &Value::Null)))
        .and_then(Value::as_array)
        .map(|arr| arr.iter().any(|v| v.as_str().is_some_and(|s| s.eq_ignore_ascii_case(expected))))
        .unwrap_or(false)
        || payload
            .as_object()
            .and_then(|o| o.iter().find(|(k, _)| k.eq_ignore_ascii_case("schemas")))
            .and_then(|(_, v)| v.as_array())
            .map(|arr| arr.iter().any(|v| v.as_str().is_some_and(|s| s.eq_ignore_ascii_case(expected))))
            .unwrap_or(false)
}

pub struct CreateInput {
    pub resource_type: ResourceType,
    pub payload: Value,
}

fn uniqueness_columns(resource_type: ResourceType, payload: &Value) -> Result<(Option<String>, Option<String>, Option<String>, bool), ScimError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ScimError::invalid_syntax("resource body must be a JSON object"))?;

    let external_id = find_str(obj, "externalId");

    match resource_type {
        ResourceType::User => {
            let user_name = find_str(obj, "userName").filter(|s| !s.is_empty()).ok_or_else(|| {
                ScimError::invalid_syntax("userName is required")
            })?;
            let active = find_bool(obj, "active").unwrap_or(true);
            Ok((external_id, Some(user_name), None, active))
        }
        ResourceType::Group => {
            let display_name = find_str(obj, "displayName").filter(|s| !s.is_empty()).ok_or_else(|| {
                ScimError::invalid_syntax("displayName is required")
            })?;
            Ok((external_id, None, Some(display_name), true))
        }
    }
}

fn expected_schema(resource_type: ResourceType) -> &'static str {
    response::default_schema_for(resource_type)
}

#[tracing::instrument(skip(pool, input), fields(endpoint_id, resource_type = ?input.resource_type))]
pub async fn create(
    pool: &SqlitePool,
    endpoint_id: &str,
    input: CreateInput,
) -> Result<Resource, ScimError> {
    if !has_schema(&input.payload, expected_schema(input.resource_type)) {
        return Err(ScimError::invalid_syntax(format!(
            "body must declare schema '{}'",
            expected_schema(input.resource_type)
        )));
    }

    let (external_id, user_name, display_name, active) = uniqueness_columns(input.resource_type, &input.payload)?;

    let mut payload = input.payload.clone();
    let scim_id = payload
        .as_object()
        .and_then(|o| find_str(o, "id"))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    response::strip_server_managed(&mut payload);

    let mut tx = pool.begin().await.map_err(StoreError::from)?;
    let created = resources::create_tx(
        &mut tx,
        NewResource {
            endpoint_id: endpoint_id.to_string(),
            resource_type: input.resource_type,
            scim_id,
            external_id,
            user_name,
            display_name,
            active,
            payload,
        },
    )
    .await?;

    if created.resource_type == ResourceType::Group {
        membership::sync_members_tx(&mut tx, endpoint_id, created.id, &created.payload).await?;
    }
    tx.commit().await.map_err(StoreError::from)?;

    Ok(created)
}

#[tracing::instrument(skip(pool))]
pub async fn get(
    pool: &SqlitePool,
    endpoint_id: &str,
    resource_type: ResourceType,
    scim_id: &str,
) -> Result<Resource, ScimError> {
    let repo = crate::store::resources::ResourceRepository::new(pool.clone());
    repo.get_by_scim_id(endpoint_id, resource_type, scim_id)
        .await?
        .ok_or_else(|| ScimError::no_target(format!("no such resource '{scim_id}'")))
}

fn check_if_match(if_match: Option<&str>, current: &Resource) -> Result<(), ScimError> {
    match if_match {
        None | Some("*") => Ok(()),
        Some(tag) if tag == current.etag() => Ok(()),
        Some(_) => Err(ScimError::VersionMismatch),
    }
}

#[tracing::instrument(skip(pool, payload))]
pub async fn replace(
    pool: &SqlitePool,
    endpoint_id: &str,
    resource_type: ResourceType,
    scim_id: &str,
    mut payload: Value,
    if_match: Option<&str>,
) -> Result<Resource, ScimError> {
    if !has_schema(&payload, expected_schema(resource_type)) {
        return Err(ScimError::invalid_syntax(format!(
            "body must declare schema '{}'",
            expected_schema(resource_type)
        )));
    }

    let (external_id, user_name, display_name, active) = uniqueness_columns(resource_type, &payload)?;
    response::strip_server_managed(&mut payload);

    let mut tx = pool.begin().await.map_err(StoreError::from)?;
    let internal_id = find_internal_id_tx(&mut tx, endpoint_id, resource_type, scim_id).await?;
    let current = resources::get_by_id_tx(&mut tx, internal_id)
        .await?
        .ok_or_else(|| ScimError::no_target(format!("no such resource '{scim_id}'")))?;

    check_if_match(if_match, &current)?;

    let updated = match resources::update_tx(
        &mut tx,
        endpoint_id,
        resource_type,
        current.id,
        external_id,
        user_name,
        display_name,
        active,
        payload,
        current.version,
    )
    .await
    {
        Ok(r) => r,
        Err(StoreError::NotFound) => return Err(ScimError::VersionMismatch),
        Err(e) => return Err(e.into()),
    };

    if updated.resource_type == ResourceType::Group {
        membership::sync_members_tx(&mut tx, endpoint_id, updated.id, &updated.payload).await?;
    }
    tx.commit().await.map_err(StoreError::from)?;

    Ok(updated)
}

async fn find_internal_id_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    endpoint_id: &str,
    resource_type: ResourceType,
    scim_id: &str,
) -> Result<i64, ScimError> {
    resources::get_by_scim_id_any_type_tx(tx, endpoint_id, resource_type, scim_id)
        .await?
        .map(|r| r.id)
        .ok_or_else(|| ScimError::no_target(format!("no such resource '{scim_id}'")))
}

/// Applies policy gates for Group membership PATCH operations before
/// letting the generic patch engine mutate the payload.
fn check_member_op_policy(
    op: PatchOpKind,
    path: &PatchPath,
    config: &TenantConfig,
    add_members_seen: &mut u32,
) -> Result<(), ScimError> {
    let targets_members = matches!(
        path,
        PatchPath::Simple(p) if p.eq_ignore_ascii_case("members")
    ) || matches!(
        path,
        PatchPath::ValueFilter { attr, .. } if attr.eq_ignore_ascii_case("members")
    );

    if !targets_members {
        return Ok(());
    }

    match op {
        PatchOpKind::Remove if matches!(path, PatchPath::Simple(_)) => {
            if !config.patch_op_allow_remove_all_members {
                return Err(ScimError::no_target(
                    "remove /members without a filter is not permitted for this endpoint",
                ));
            }
        }
        PatchOpKind::Add => {
            *add_members_seen += 1;
            if *add_members_seen > 1 && !config.multi_op_patch_add_multiple_members {
                return Err(ScimError::InvalidValue {
                    detail: "multiple add /members operations are not permitted for this endpoint".to_string(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

#[tracing::instrument(skip(pool, request, config))]
pub async fn patch(
    pool: &SqlitePool,
    endpoint_id: &str,
    resource_type: ResourceType,
    scim_id: &str,
    request: &PatchRequest,
    if_match: Option<&str>,
    config: &TenantConfig,
) -> Result<Resource, ScimError> {
    if request
        .schemas
        .iter()
        .all(|s| !s.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
    {
        return Err(ScimError::invalid_syntax(format!(
            "PatchOp request must declare schema '{PATCH_OP_SCHEMA}'"
        )));
    }

    let mut tx = pool.begin().await.map_err(StoreError::from)?;
    let internal_id = find_internal_id_tx(&mut tx, endpoint_id, resource_type, scim_id).await?;
    let current = resources::get_by_id_tx(&mut tx, internal_id)
        .await?
        .ok_or_else(|| ScimError::no_target(format!("no such resource '{scim_id}'")))?;

    check_if_match(if_match, &current)?;

    let mut payload = current.payload.clone();
    let mut add_members_seen = 0u32;
    for operation in &request.operations {
        apply_single_patch_operation(
            &mut payload,
            operation,
            resource_type,
            config,
            &mut add_members_seen,
        )?;
    }

    let (external_id, user_name, display_name, active) = uniqueness_columns(resource_type, &payload)?;

    let updated = match resources::update_tx(
        &mut tx,
        endpoint_id,
        resource_type,
        current.id,
        external_id,
        user_name,
        display_name,
        active,
        payload,
        current.version,
    )
    .await
    {
        Ok(r) => r,
        Err(StoreError::NotFound) => return Err(ScimError::VersionMismatch),
        Err(e) => return Err(e.into()),
    };

    if updated.resource_type == ResourceType::Group {
        membership::sync_members_tx(&mut tx, endpoint_id, updated.id, &updated.payload).await?;
    }
    tx.commit().await.map_err(StoreError::from)?;

    Ok(updated)
}

fn apply_single_patch_operation(
    payload: &mut Value,
    operation: &PatchOperation,
    resource_type: ResourceType,
    config: &TenantConfig,
    add_members_seen: &mut u32,
) -> Result<(), ScimError> {
    let kind = PatchOpKind::parse(&operation.op)?;
    let path = parse_path(operation.path.as_deref())?;

    if resource_type == ResourceType::Group {
        check_member_op_policy(kind, &path, config, add_members_seen)?;
    }

    apply_op(payload, kind, &path, operation.value.clone())
}

#[tracing::instrument(skip(pool))]
pub async fn delete(
    pool: &SqlitePool,
    endpoint_id: &str,
    resource_type: ResourceType,
    scim_id: &str,
    if_match: Option<&str>,
) -> Result<(), ScimError> {
    let mut tx = pool.begin().await.map_err(StoreError::from)?;
    let internal_id = find_internal_id_tx(&mut tx, endpoint_id, resource_type, scim_id).await?;
    let current = resources::get_by_id_tx(&mut tx, internal_id)
        .await?
        .ok_or_else(|| ScimError::no_target(format!("no such resource '{scim_id}'")))?;

    check_if_match(if_match, &current)?;

    resources::delete_tx(&mut tx, current.id).await?;
    tx.commit().await.map_err(StoreError::from)?;
    Ok(())
}
