//! Projects a stored `store::resources::Resource` row onto the wire-format
//! SCIM document: `schemas`/`id`/`meta` come from the record, never from the
//! stored `payload`.

use serde_json::{Map, Value};

use crate::store::resources::{Resource, ResourceType};

const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

fn find_key_ci(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

pub fn default_schema_for(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::User => USER_SCHEMA,
        ResourceType::Group => GROUP_SCHEMA,
    }
}

/// Strips the server-managed keys (`id`, `meta`) a client may have sent, so
/// the stored payload holds only client-owned attributes. `schemas` is kept.
pub fn strip_server_managed(payload: &mut Value) {
    if let Some(obj) = payload.as_object_mut() {
        let keys_to_remove: Vec<String> = obj
            .keys()
            .filter(|k| k.eq_ignore_ascii_case("id") || k.eq_ignore_ascii_case("meta"))
            .cloned()
            .collect();
        for key in keys_to_remove {
            obj.remove(&key);
        }
    }
}

/// Builds the full wire-format document for a resource, `base_url` being the
/// tenant's advertised base URL used for `meta.location`.
pub fn build_document(resource: &Resource, base_url: &str) -> Value {
    let mut body = resource.payload.clone();
    let obj = body.as_object_mut().expect("payload is always a JSON object");

    if find_key_ci(obj, "schemas").is_none() {
        obj.insert(
            "schemas".to_string(),
            Value::Array(vec![Value::String(default_schema_for(resource.resource_type).to_string())]),
        );
    }

    let id_key = find_key_ci(obj, "id").unwrap_or_else(|| "id".to_string());
    obj.insert(id_key, Value::String(resource.scim_id.clone()));

    let meta_key = find_key_ci(obj, "meta").unwrap_or_else(|| "meta".to_string());
    let collection = match resource.resource_type {
        ResourceType::User => "Users",
        ResourceType::Group => "Groups",
    };
    obj.insert(
        meta_key,
        serde_json::json!({
            "resourceType": resource.resource_type.to_string(),
            "created": resource.created_at.to_rfc3339(),
            "lastModified": resource.updated_at.to_rfc3339(),
            "location": format!("{base_url}/{collection}/{}", resource.scim_id),
            "version": resource.etag(),
        }),
    );

    body
}

/// Extracts a human-meaningful identifier from a wire-format document, used
/// by the audit pipeline for UI grouping.
pub fn extract_identifier(resource_type: ResourceType, document: &Value) -> Option<String> {
    let obj = document.as_object()?;
    match resource_type {
        ResourceType::User => find_key_ci(obj, "userName").and_then(|k| obj[&k].as_str().map(str::to_string)),
        ResourceType::Group => find_key_ci(obj, "displayName").and_then(|k| obj[&k].as_str().map(str::to_string)),
    }
}
