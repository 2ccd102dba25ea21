//! Property test for the PATCH path engine's §8 "sequential equivalence"
//! invariant: applying `[op1, …, opN]` in one `apply_patch_request` call
//! produces the same payload as applying each operation one at a time.
//!
//! Exercises `scim_sandbox::patch` directly rather than through HTTP —
//! sequential equivalence is a property of the engine's pure payload
//! transform, not of storage or concurrency, so there's nothing the extra
//! weight of a router/pool buys here.

use proptest::prelude::*;
use scim_sandbox::patch::{apply_patch_request, PatchOperation, PatchRequest};
use serde_json::{json, Value};

const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

fn base_user() -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": "u1",
        "userName": "pat",
        "active": true,
        "name": { "givenName": "Pat", "familyName": "Doe" },
        "emails": [],
    })
}

fn op_strategy() -> impl Strategy<Value = PatchOperation> {
    prop_oneof![
        any::<bool>().prop_map(|v| PatchOperation {
            op: "replace".to_string(),
            path: Some("active".to_string()),
            value: Some(Value::Bool(v)),
        }),
        "[a-zA-Z]{1,12}".prop_map(|v| PatchOperation {
            op: "replace".to_string(),
            path: Some("displayName".to_string()),
            value: Some(Value::String(v)),
        }),
        "[a-zA-Z]{1,12}".prop_map(|v| PatchOperation {
            op: "replace".to_string(),
            path: Some("name.givenName".to_string()),
            value: Some(Value::String(v)),
        }),
        "[a-z]{1,8}@work\\.example".prop_map(|v| PatchOperation {
            op: "add".to_string(),
            path: Some("emails[type eq \"work\"].value".to_string()),
            value: Some(Value::String(v)),
        }),
    ]
}

fn apply_all_at_once(payload: &Value, ops: &[PatchOperation]) -> Result<Value, String> {
    let mut body = payload.clone();
    let request = PatchRequest {
        schemas: vec![PATCH_OP_SCHEMA.to_string()],
        operations: ops.to_vec(),
    };
    apply_patch_request(&mut body, &request).map_err(|e| e.to_string())?;
    Ok(body)
}

fn apply_one_at_a_time(payload: &Value, ops: &[PatchOperation]) -> Result<Value, String> {
    let mut body = payload.clone();
    for op in ops {
        let request = PatchRequest {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations: vec![op.clone()],
        };
        apply_patch_request(&mut body, &request).map_err(|e| e.to_string())?;
    }
    Ok(body)
}

proptest! {
    #[test]
    fn sequential_application_matches_batch_application(ops in prop::collection::vec(op_strategy(), 0..8)) {
        let payload = base_user();
        let batch = apply_all_at_once(&payload, &ops);
        let sequential = apply_one_at_a_time(&payload, &ops);
        prop_assert_eq!(batch, sequential);
    }
}

#[test]
fn manager_extension_patch_wraps_value_under_urn() {
    let mut payload = base_user();
    let request = PatchRequest {
        schemas: vec![PATCH_OP_SCHEMA.to_string()],
        operations: vec![PatchOperation {
            op: "replace".to_string(),
            path: Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager".to_string()),
            value: Some(Value::String("MGR-1".to_string())),
        }],
    };
    apply_patch_request(&mut payload, &request).unwrap();
    let extension = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
    assert_eq!(payload[extension]["manager"]["value"], "MGR-1");
}

#[test]
fn value_filter_add_on_empty_array_creates_single_element() {
    let mut payload = base_user();
    let request = PatchRequest {
        schemas: vec![PATCH_OP_SCHEMA.to_string()],
        operations: vec![PatchOperation {
            op: "add".to_string(),
            path: Some("emails[type eq \"work\"].value".to_string()),
            value: Some(Value::String("a@w".to_string())),
        }],
    };
    apply_patch_request(&mut payload, &request).unwrap();
    assert_eq!(payload["emails"], json!([{ "type": "work", "value": "a@w" }]));
}
