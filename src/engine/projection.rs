//! Attribute projection: `attributes` / `excludedAttributes` query-param
//! handling, applied to an already-built response document.

use serde_json::{Map, Value};

/// Keys that are never removed and, under `attributes`, are always present
/// regardless of whether they were named.
const ALWAYS_RETURNED: &[&str] = &["schemas", "id", "meta"];

struct Selector {
    /// top-level attribute name (as requested, original casing) -> requested
    /// sub-attributes, or `None` if the whole attribute was selected.
    tops: Vec<(String, Option<Vec<String>>)>,
}

fn parse_spec(spec: &str) -> Selector {
    let mut tops: Vec<(String, Option<Vec<String>>)> = Vec::new();
    for raw in spec.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let mut parts = raw.splitn(2, '.');
        let top = parts.next().unwrap().to_string();
        let sub = parts.next().map(|s| s.to_string());

        if let Some(entry) = tops.iter_mut().find(|(t, _)| t.eq_ignore_ascii_case(&top)) {
            match (&mut entry.1, sub) {
                (Some(subs), Some(s)) => subs.push(s),
                (slot @ Some(_), None) => *slot = None,
                (None, _) => {}
            }
        } else {
            tops.push((top, sub.map(|s| vec![s])));
        }
    }
    Selector { tops }
}

fn find_key_ci(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

/// Applies `attributes` / `excludedAttributes` to `body`. When both are
/// present, `attributes` wins.
pub fn project(body: &Value, attributes: Option<&str>, excluded_attributes: Option<&str>) -> Value {
    let Some(obj) = body.as_object() else {
        return body.clone();
    };

    if let Some(spec) = attributes {
        return project_include(obj, &parse_spec(spec));
    }
    if let Some(spec) = excluded_attributes {
        return project_exclude(obj, &parse_spec(spec));
    }
    body.clone()
}

fn project_include(obj: &Map<String, Value>, selector: &Selector) -> Value {
    let mut out = Map::new();

    for always in ALWAYS_RETURNED {
        if let Some(key) = find_key_ci(obj, always) {
            out.insert(key, obj[always].clone());
        }
    }

    for (top, subs) in &selector.tops {
        if ALWAYS_RETURNED.iter().any(|a| a.eq_ignore_ascii_case(top)) {
            continue;
        }
        let Some(key) = find_key_ci(obj, top) else { continue };
        let value = &obj[&key];

        match subs {
            None => {
                out.insert(key, value.clone());
            }
            Some(sub_names) => {
                if let Some(nested) = value.as_object() {
                    let mut sub_out = Map::new();
                    for sub in sub_names {
                        if let Some(sub_key) = find_key_ci(nested, sub) {
                            sub_out.insert(sub_key, nested[sub].clone());
                        }
                    }
                    out.insert(key, Value::Object(sub_out));
                } else {
                    out.insert(key, value.clone());
                }
            }
        }
    }

    Value::Object(out)
}

fn project_exclude(obj: &Map<String, Value>, selector: &Selector) -> Value {
    let mut out = obj.clone();

    for (top, subs) in &selector.tops {
        if ALWAYS_RETURNED.iter().any(|a| a.eq_ignore_ascii_case(top)) {
            continue;
        }
        let Some(key) = find_key_ci(&out, top) else { continue };

        match subs {
            None => {
                out.remove(&key);
            }
            Some(sub_names) => {
                if let Some(nested) = out.get_mut(&key).and_then(Value::as_object_mut) {
                    for sub in sub_names {
                        if let Some(sub_key) = find_key_ci(nested, sub) {
                            nested.remove(&sub_key);
                        }
                    }
                }
            }
        }
    }

    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_keeps_always_returned_plus_selected() {
        let body = json!({"schemas": ["x"], "id": "1", "meta": {}, "userName": "alice", "displayName": "Alice"});
        let projected = project(&body, Some("userName"), None);
        assert_eq!(projected["userName"], "alice");
        assert!(projected.get("displayName").is_none());
        assert_eq!(projected["id"], "1");
    }

    #[test]
    fn excluded_never_removes_always_returned() {
        let body = json!({"schemas": ["x"], "id": "1", "meta": {}, "userName": "alice"});
        let projected = project(&body, None, Some("id,schemas,meta,userName"));
        assert_eq!(projected["id"], "1");
        assert!(projected.get("userName").is_none());
    }

    #[test]
    fn attributes_wins_over_excluded() {
        let body = json!({"schemas": ["x"], "id": "1", "meta": {}, "userName": "alice"});
        let projected = project(&body, Some("userName"), Some("userName"));
        assert_eq!(projected["userName"], "alice");
    }

    #[test]
    fn sub_attribute_selection_narrows_nested_object() {
        let body = json!({"schemas": ["x"], "id": "1", "meta": {}, "name": {"givenName": "A", "familyName": "B"}});
        let projected = project(&body, Some("name.givenName"), None);
        assert_eq!(projected["name"], json!({"givenName": "A"}));
    }
}
