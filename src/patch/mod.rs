//! The PATCH path engine: parses and evaluates the three SCIM PATCH path
//! shapes (simple, value-filter, and URN-extension) and applies
//! `add`/`replace`/`remove` operations to a resource's JSON payload.
//!
//! This module is deliberately payload-only. The resource engine is
//! responsible for validating the `PatchOp` envelope's `schemas`, enforcing
//! the tenant config flags that gate `/members` PATCH specifics, and
//! re-deriving `resource_members` rows from the merged payload.

mod apply;
mod path;

pub use apply::{apply_op, PatchOpKind};
pub use path::{parse_path, PatchPath};

use serde::Deserialize;

use crate::error::ScimError;

/// The RFC 7644 PatchOp request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Applies every operation in `request` to `payload`, in array order, so a
/// later op observes the effect of an earlier one.
pub fn apply_patch_request(payload: &mut serde_json::Value, request: &PatchRequest) -> Result<(), ScimError> {
    if request
        .schemas
        .iter()
        .all(|s| !s.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
    {
        return Err(ScimError::invalid_syntax(format!(
            "PatchOp request must declare schema '{PATCH_OP_SCHEMA}'"
        )));
    }

    for operation in &request.operations {
        let kind = PatchOpKind::parse(&operation.op)?;
        let parsed_path = path::parse_path(operation.path.as_deref())?;
        apply_op(payload, kind, &parsed_path, operation.value.clone())?;
    }
    Ok(())
}
