//! Applies a single parsed PATCH operation to a payload document.
//!
//! Everything here is a pure JSON transform: `{resource_type}` is only
//! consulted for immutable-attribute guarding, never for membership
//! bookkeeping. The engine layer owns syncing `resource_members` from the
//! `members` array after the merged payload is computed.

use serde_json::{Map, Value};

use crate::error::ScimError;
use crate::patch::path::PatchPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

impl PatchOpKind {
    pub fn parse(raw: &str) -> Result<Self, ScimError> {
        match raw.to_lowercase().as_str() {
            "add" => Ok(PatchOpKind::Add),
            "replace" => Ok(PatchOpKind::Replace),
            "remove" => Ok(PatchOpKind::Remove),
            other => Err(ScimError::InvalidValue {
                detail: format!("unsupported PATCH op '{other}'"),
            }),
        }
    }
}

/// Attributes that may never be changed by a PATCH operation.
const IMMUTABLE_ROOT_ATTRS: &[&str] = &["id", "schemas"];

fn guard_immutable(name: &str) -> Result<(), ScimError> {
    if IMMUTABLE_ROOT_ATTRS.iter().any(|a| a.eq_ignore_ascii_case(name)) {
        return Err(ScimError::Mutability {
            detail: format!("attribute '{name}' is immutable"),
        });
    }
    Ok(())
}

fn as_object_mut(payload: &mut Value) -> Result<&mut Map<String, Value>, ScimError> {
    payload
        .as_object_mut()
        .ok_or_else(|| ScimError::invalid_syntax("payload is not a JSON object"))
}

fn find_key_ci(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

/// Applies one PATCH operation to `payload` in place.
pub fn apply_op(
    payload: &mut Value,
    op: PatchOpKind,
    path: &PatchPath,
    value: Option<Value>,
) -> Result<(), ScimError> {
    match path {
        PatchPath::NoPath => apply_no_path(payload, op, value),
        PatchPath::Simple(dotted) => apply_simple(payload, op, dotted, value),
        PatchPath::ValueFilter {
            attr,
            filter_attr,
            op: filter_op,
            value: filter_value,
            sub_attr,
        } => apply_value_filter(payload, op, attr, filter_attr, filter_op, filter_value, sub_attr.as_deref(), value),
        PatchPath::Extension { urn, attr_path } => apply_extension(payload, op, urn, attr_path, value),
    }
}

/// A no-path merge: `value` must be an object; each key is resolved as an
/// extension URN key, a dotted path, or a flat key.
fn apply_no_path(payload: &mut Value, op: PatchOpKind, value: Option<Value>) -> Result<(), ScimError> {
    if op == PatchOpKind::Remove {
        return Err(ScimError::no_target("remove with no path is not supported"));
    }

    let value = value.ok_or_else(|| ScimError::InvalidValue {
        detail: "add/replace with no path requires a value".into(),
    })?;
    let obj = value
        .as_object()
        .ok_or_else(|| ScimError::InvalidValue {
            detail: "add/replace with no path requires an object value".into(),
        })?
        .clone();

    for (key, val) in obj {
        if let Some(urn) = super::path::KNOWN_EXTENSION_URNS
            .iter()
            .find(|u| u.eq_ignore_ascii_case(&key))
        {
            merge_extension_object(payload, urn, &val)?;
        } else if key.contains('.') {
            apply_simple(payload, op, &key, Some(val))?;
        } else {
            guard_immutable(&key)?;
            let root = as_object_mut(payload)?;
            let existing_key = find_key_ci(root, &key).unwrap_or_else(|| key.clone());
            root.insert(existing_key, val);
        }
    }
    Ok(())
}

fn merge_extension_object(payload: &mut Value, urn: &str, incoming: &Value) -> Result<(), ScimError> {
    let incoming_obj = incoming
        .as_object()
        .ok_or_else(|| ScimError::InvalidValue {
            detail: format!("extension '{urn}' value must be an object"),
        })?
        .clone();

    let root = as_object_mut(payload)?;
    let key = find_key_ci(root, urn).unwrap_or_else(|| urn.to_string());
    let entry = root.entry(key).or_insert_with(|| Value::Object(Map::new()));
    let ext_obj = entry
        .as_object_mut()
        .ok_or_else(|| ScimError::invalid_syntax(format!("extension '{urn}' is not an object")))?;

    for (sub_key, sub_val) in incoming_obj {
        let wrapped = wrap_manager_if_needed(&sub_key, sub_val);
        let existing_key = find_key_ci(ext_obj, &sub_key).unwrap_or(sub_key);
        ext_obj.insert(existing_key, wrapped);
    }
    Ok(())
}

/// A bare string assigned to `manager` in the Enterprise extension is
/// wrapped as `{value: "<string>"}`.
fn wrap_manager_if_needed(attr_name: &str, value: Value) -> Value {
    if attr_name.eq_ignore_ascii_case("manager") {
        if let Value::String(s) = value {
            let mut wrapped = Map::new();
            wrapped.insert("value".to_string(), Value::String(s));
            return Value::Object(wrapped);
        }
    }
    value
}

fn apply_simple(payload: &mut Value, op: PatchOpKind, dotted: &str, value: Option<Value>) -> Result<(), ScimError> {
    let segments: Vec<&str> = dotted.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ScimError::invalid_path(format!("malformed dotted path: {dotted}")));
    }
    guard_immutable(segments[0])?;

    let (parents, leaf) = segments.split_at(segments.len() - 1);
    let leaf = leaf[0];

    match op {
        PatchOpKind::Remove => {
            let Some(parent) = navigate_object(payload, parents)? else {
                return Ok(());
            };
            if let Some(key) = find_key_ci(parent, leaf) {
                parent.remove(&key);
            }
            Ok(())
        }
        PatchOpKind::Replace | PatchOpKind::Add => {
            let value = value.ok_or_else(|| ScimError::InvalidValue {
                detail: format!("{op:?} on '{dotted}' requires a value"),
            })?;
            let parent = navigate_or_create_object(payload, parents)?;
            let existing_key = find_key_ci(parent, leaf);

            if op == PatchOpKind::Add {
                if let Some(key) = &existing_key {
                    if let Some(existing_array) = parent.get_mut(key).filter(|v| v.is_array()) {
                        append_deduped(existing_array, leaf, value);
                        return Ok(());
                    }
                } else if value.is_array() {
                    let key = leaf.to_string();
                    parent.insert(key, Value::Array(Vec::new()));
                    let slot = parent.get_mut(leaf).unwrap();
                    append_deduped(slot, leaf, value);
                    return Ok(());
                }
            }

            let key = existing_key.unwrap_or_else(|| leaf.to_string());
            parent.insert(key, value);
            Ok(())
        }
    }
}

/// Appends `value` (expected to be an array) onto `existing`, deduping each
/// incoming element against existing elements by their shared `value`
/// sub-attribute when `attr_name` is `members`, and by full equality
/// otherwise.
fn append_deduped(existing: &mut Value, attr_name: &str, incoming: Value) {
    let Some(items) = incoming.as_array() else {
        return;
    };
    let Some(existing_arr) = existing.as_array_mut() else {
        return;
    };

    for item in items {
        let is_dup = if attr_name.eq_ignore_ascii_case("members") {
            let incoming_value = item.get("value").and_then(Value::as_str);
            match incoming_value {
                Some(v) => existing_arr
                    .iter()
                    .any(|e| e.get("value").and_then(Value::as_str) == Some(v)),
                None => existing_arr.contains(item),
            }
        } else {
            existing_arr.contains(item)
        };
        if !is_dup {
            existing_arr.push(item.clone());
        }
    }
}

fn navigate_object<'a>(
    payload: &'a mut Value,
    segments: &[&str],
) -> Result<Option<&'a mut Map<String, Value>>, ScimError> {
    let mut current = as_object_mut(payload)?;
    for seg in segments {
        let Some(key) = find_key_ci(current, seg) else {
            return Ok(None);
        };
        let Some(next) = current.get_mut(&key).and_then(Value::as_object_mut) else {
            return Ok(None);
        };
        current = next;
    }
    Ok(Some(current))
}

fn navigate_or_create_object<'a>(
    payload: &'a mut Value,
    segments: &[&str],
) -> Result<&'a mut Map<String, Value>, ScimError> {
    let mut current = as_object_mut(payload)?;
    for seg in segments {
        let key = find_key_ci(current, seg).unwrap_or_else(|| seg.to_string());
        let entry = current.entry(key).or_insert_with(|| Value::Object(Map::new()));
        current = entry
            .as_object_mut()
            .ok_or_else(|| ScimError::invalid_path(format!("attribute '{seg}' is not complex")))?;
    }
    Ok(current)
}

fn values_equal(op: &str, actual: &Value, expected: &str) -> bool {
    let actual_str = match actual {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if op == "eq" {
        actual_str.eq_ignore_ascii_case(expected)
    } else {
        actual_str == expected
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_value_filter(
    payload: &mut Value,
    op: PatchOpKind,
    attr: &str,
    filter_attr: &str,
    filter_op: &str,
    filter_value: &str,
    sub_attr: Option<&str>,
    value: Option<Value>,
) -> Result<(), ScimError> {
    guard_immutable(attr)?;

    let root = as_object_mut(payload)?;
    let array_key = find_key_ci(root, attr);

    match op {
        PatchOpKind::Remove => {
            let Some(key) = array_key else { return Ok(()) };
            let Some(arr) = root.get_mut(&key).and_then(Value::as_array_mut) else {
                return Ok(());
            };
            if let Some(sub) = sub_attr {
                for elem in arr.iter_mut() {
                    if matches_filter(elem, filter_attr, filter_op, filter_value) {
                        if let Some(obj) = elem.as_object_mut() {
                            if let Some(k) = find_key_ci(obj, sub) {
                                obj.remove(&k);
                            }
                        }
                    }
                }
            } else {
                arr.retain(|elem| !matches_filter(elem, filter_attr, filter_op, filter_value));
            }
            Ok(())
        }
        PatchOpKind::Replace => {
            let value = value.ok_or_else(|| ScimError::InvalidValue {
                detail: format!("replace on '{attr}' filter requires a value"),
            })?;
            let key = array_key.ok_or_else(|| ScimError::no_target(format!("no '{attr}' to replace")))?;
            let arr = root
                .get_mut(&key)
                .and_then(Value::as_array_mut)
                .ok_or_else(|| ScimError::invalid_syntax(format!("'{attr}' is not multi-valued")))?;

            let mut matched = false;
            for elem in arr.iter_mut() {
                if matches_filter(elem, filter_attr, filter_op, filter_value) {
                    matched = true;
                    set_matched_element(elem, sub_attr, value.clone())?;
                }
            }
            if !matched {
                return Err(ScimError::no_target(format!(
                    "no element of '{attr}' matches the filter"
                )));
            }
            Ok(())
        }
        PatchOpKind::Add => {
            let value = value.ok_or_else(|| ScimError::InvalidValue {
                detail: format!("add on '{attr}' filter requires a value"),
            })?;
            let key = array_key.unwrap_or_else(|| attr.to_string());
            let entry = root.entry(key).or_insert_with(|| Value::Array(Vec::new()));
            let arr = entry
                .as_array_mut()
                .ok_or_else(|| ScimError::invalid_syntax(format!("'{attr}' is not multi-valued")))?;

            let mut matched = false;
            for elem in arr.iter_mut() {
                if matches_filter(elem, filter_attr, filter_op, filter_value) {
                    matched = true;
                    set_matched_element(elem, sub_attr, value.clone())?;
                }
            }
            if !matched {
                let mut new_elem = Map::new();
                new_elem.insert(filter_attr.to_string(), Value::String(filter_value.to_string()));
                match sub_attr {
                    Some(sub) => {
                        new_elem.insert(sub.to_string(), value);
                    }
                    None => {
                        if let Some(obj) = value.as_object() {
                            for (k, v) in obj.clone() {
                                new_elem.insert(k, v);
                            }
                        } else {
                            return Err(ScimError::InvalidValue {
                                detail: format!("add on '{attr}' without a sub-attribute requires an object value"),
                            });
                        }
                    }
                }
                arr.push(Value::Object(new_elem));
            }
            Ok(())
        }
    }
}

fn set_matched_element(elem: &mut Value, sub_attr: Option<&str>, value: Value) -> Result<(), ScimError> {
    match sub_attr {
        Some(sub) => {
            let obj = elem
                .as_object_mut()
                .ok_or_else(|| ScimError::invalid_syntax("matched element is not an object"))?;
            let key = find_key_ci(obj, sub).unwrap_or_else(|| sub.to_string());
            obj.insert(key, value);
        }
        None => {
            *elem = value;
        }
    }
    Ok(())
}

fn matches_filter(elem: &Value, filter_attr: &str, filter_op: &str, filter_value: &str) -> bool {
    let Some(obj) = elem.as_object() else { return false };
    let Some(key) = find_key_ci(obj, filter_attr) else {
        return false;
    };
    values_equal(filter_op, &obj[&key], filter_value)
}

fn apply_extension(
    payload: &mut Value,
    op: PatchOpKind,
    urn: &str,
    attr_path: &str,
    value: Option<Value>,
) -> Result<(), ScimError> {
    let root = as_object_mut(payload)?;
    let urn_key = find_key_ci(root, urn).unwrap_or_else(|| urn.to_string());

    match op {
        PatchOpKind::Remove => {
            let Some(ext) = root.get_mut(&urn_key).and_then(Value::as_object_mut) else {
                return Ok(());
            };
            if let Some(key) = find_key_ci(ext, attr_path) {
                ext.remove(&key);
            }
            Ok(())
        }
        PatchOpKind::Replace | PatchOpKind::Add => {
            let value = value.ok_or_else(|| ScimError::InvalidValue {
                detail: format!("{op:?} on extension attribute '{attr_path}' requires a value"),
            })?;
            let value = wrap_manager_if_needed(attr_path, value);
            let entry = root.entry(urn_key).or_insert_with(|| Value::Object(Map::new()));
            let ext = entry
                .as_object_mut()
                .ok_or_else(|| ScimError::invalid_syntax(format!("extension '{urn}' is not an object")))?;
            let key = find_key_ci(ext, attr_path).unwrap_or_else(|| attr_path.to_string());
            ext.insert(key, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::path::parse_path;
    use serde_json::json;

    fn apply(payload: &mut Value, op: &str, path: Option<&str>, value: Option<Value>) {
        let parsed = parse_path(path).unwrap();
        let kind = PatchOpKind::parse(op).unwrap();
        apply_op(payload, kind, &parsed, value).unwrap();
    }

    #[test]
    fn simple_replace_scalar() {
        let mut payload = json!({"displayName": "Old"});
        apply(&mut payload, "replace", Some("displayName"), Some(json!("New")));
        assert_eq!(payload["displayName"], "New");
    }

    #[test]
    fn simple_replace_nested_creates_parents() {
        let mut payload = json!({});
        apply(&mut payload, "replace", Some("name.givenName"), Some(json!("Alice")));
        assert_eq!(payload["name"]["givenName"], "Alice");
    }

    #[test]
    fn value_filter_add_on_empty_creates_element() {
        let mut payload = json!({});
        apply(
            &mut payload,
            "add",
            Some(r#"emails[type eq "work"].value"#),
            Some(json!("a@w")),
        );
        assert_eq!(payload["emails"], json!([{"type": "work", "value": "a@w"}]));
    }

    #[test]
    fn value_filter_replace_updates_matching_element() {
        let mut payload = json!({"emails": [{"type": "work", "value": "old"}, {"type": "home", "value": "h"}]});
        apply(
            &mut payload,
            "replace",
            Some(r#"emails[type eq "work"].value"#),
            Some(json!("new")),
        );
        assert_eq!(payload["emails"][0]["value"], "new");
        assert_eq!(payload["emails"][1]["value"], "h");
    }

    #[test]
    fn value_filter_remove_whole_element() {
        let mut payload = json!({"members": [{"value": "u1"}, {"value": "u2"}]});
        apply(&mut payload, "remove", Some(r#"members[value eq "u1"]"#), None);
        assert_eq!(payload["members"], json!([{"value": "u2"}]));
    }

    #[test]
    fn extension_manager_string_is_wrapped() {
        let mut payload = json!({});
        apply(
            &mut payload,
            "replace",
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager"),
            Some(json!("MGR-1")),
        );
        assert_eq!(
            payload["urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"]["manager"],
            json!({"value": "MGR-1"})
        );
    }

    #[test]
    fn no_path_merge_routes_extension_and_dotted_and_flat_keys() {
        let mut payload = json!({"name": {"familyName": "Existing"}});
        apply(
            &mut payload,
            "replace",
            None,
            Some(json!({
                "active": false,
                "name.givenName": "Alice",
                "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User": {"department": "Eng"}
            })),
        );
        assert_eq!(payload["active"], false);
        assert_eq!(payload["name"]["givenName"], "Alice");
        assert_eq!(payload["name"]["familyName"], "Existing");
        assert_eq!(
            payload["urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"]["department"],
            "Eng"
        );
    }

    #[test]
    fn no_path_remove_is_rejected() {
        let mut payload = json!({});
        let parsed = parse_path(None).unwrap();
        let err = apply_op(&mut payload, PatchOpKind::Remove, &parsed, None);
        assert!(err.is_err());
    }

    #[test]
    fn immutable_id_cannot_be_replaced() {
        let mut payload = json!({"id": "abc"});
        let parsed = parse_path(Some("id")).unwrap();
        let err = apply_op(&mut payload, PatchOpKind::Replace, &parsed, Some(json!("xyz")));
        assert!(err.is_err());
    }

    #[test]
    fn members_add_array_dedupes_by_value() {
        let mut payload = json!({"members": [{"value": "u1"}]});
        apply(
            &mut payload,
            "add",
            Some("members"),
            Some(json!([{"value": "u1"}, {"value": "u2"}])),
        );
        assert_eq!(payload["members"], json!([{"value": "u1"}, {"value": "u2"}]));
    }
}
