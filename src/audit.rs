//! The request audit pipeline: wraps every inbound HTTP request, records
//! method/URL/status/duration/headers/bodies to the `RequestLog` store, and
//! extracts a human-meaningful `identifier` for the admin UI.
//!
//! Mounted as the innermost layer on the combined SCIM+admin+discovery
//! router (`http::router::build_router`), so it observes every route this
//! crate serves, including ones the auth gate rejects.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use serde_json::Value;

use crate::store::request_log::NewRequestLog;
use crate::AppState;

/// Headers never persisted verbatim; the `Authorization` header carries the
/// bearer credential and is always redacted.
const REDACTED_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

fn headers_to_json(headers: &HeaderMap) -> String {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        let name_str = name.as_str();
        let rendered = if REDACTED_HEADERS.contains(&name_str) {
            "[redacted]".to_string()
        } else {
            value.to_str().unwrap_or("[non-utf8]").to_string()
        };
        map.entry(name_str.to_string())
            .and_modify(|existing| {
                if let Value::String(s) = existing {
                    *existing = Value::String(format!("{s}, {rendered}"));
                }
            })
            .or_insert(Value::String(rendered));
    }
    Value::Object(map).to_string()
}

fn truncate(body: &[u8], limit: usize) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(body);
    if text.len() > limit {
        let boundary = text
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= limit)
            .last()
            .unwrap_or(0);
        Some(format!("{}... [truncated]", &text[..boundary]))
    } else {
        Some(text.into_owned())
    }
}

/// Extracts the endpoint id from a path of the shape
/// `/<prefix>[/v2]/endpoints/{id}/...`; `None` for admin/discovery/health
/// routes that carry no tenant.
fn extract_endpoint_id(path: &str) -> Option<String> {
    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if segment == "endpoints" {
            return segments.next().map(str::to_string);
        }
    }
    None
}

fn value_from_member_entry(entry: &Value) -> Option<String> {
    entry
        .as_object()
        .and_then(|o| o.iter().find(|(k, _)| k.eq_ignore_ascii_case("value")))
        .and_then(|(_, v)| v.as_str())
        .map(str::to_string)
        .or_else(|| entry.as_str().map(str::to_string))
}

/// Finds the `value` of a member a PATCH operation touched, by scanning
/// `Operations` whose `path` mentions `members`.
fn member_value_from_patch_body(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let operations = parsed
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Operations"))?
        .1
        .as_array()?;

    for op in operations {
        let obj = op.as_object()?;
        let path = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("path"))
            .and_then(|(_, v)| v.as_str());
        if !path.is_some_and(|p| p.to_lowercase().contains("members")) {
            continue;
        }
        let Some((_, value)) = obj.iter().find(|(k, _)| k.eq_ignore_ascii_case("value")) else {
            continue;
        };
        if let Some(arr) = value.as_array() {
            if let Some(first) = arr.first().and_then(value_from_member_entry) {
                return Some(first);
            }
        } else if let Some(v) = value_from_member_entry(value) {
            return Some(v);
        }
    }
    None
}

/// Finds `userName`/`displayName` at the top level of a JSON document body
/// (`userName` for a User, `displayName` for a Group).
fn name_identifier(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let obj = parsed.as_object()?;
    for key in ["userName", "displayName"] {
        if let Some((_, v)) = obj.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            if let Some(s) = v.as_str() {
                return Some(s.to_string());
            }
        }
    }
    None
}

fn extract_identifier(request_body: Option<&str>, response_body: Option<&str>) -> Option<String> {
    request_body
        .and_then(member_value_from_patch_body)
        .or_else(|| response_body.and_then(name_identifier))
        .or_else(|| request_body.and_then(name_identifier))
}

/// The audit middleware itself: buffers request and response bodies (both
/// already bounded by `DefaultBodyLimit` upstream of this layer), lets the
/// request through unmodified, then persists a `RequestLog` row. A failure
/// to persist is logged at WARN and never fails the request.
pub async fn record_request(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| path.clone());
    let endpoint_id = extract_endpoint_id(&path);
    let request_headers = headers_to_json(request.headers());

    let (parts, body) = request.into_parts();
    let body_bytes = match to_bytes(body, state.config.body_limit_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => Bytes::new(),
    };
    let request_body_text = truncate(&body_bytes, state.config.log_truncate_bytes);
    let request = Request::from_parts(parts, Body::from(body_bytes));

    let response = next.run(request).await;

    let status = response.status();
    let response_headers = headers_to_json(response.headers());
    let (parts, body) = response.into_parts();
    let response_bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => Bytes::new(),
    };
    let response_body_text = truncate(&response_bytes, state.config.log_truncate_bytes);

    let identifier = extract_identifier(request_body_text.as_deref(), response_body_text.as_deref());
    let duration_ms = start.elapsed().as_millis() as i64;

    let error_message = (status.is_server_error() || status.is_client_error())
        .then(|| response_body_text.clone())
        .flatten();

    let entry = NewRequestLog {
        endpoint_id,
        method,
        url,
        status: Some(status.as_u16() as i64),
        duration_ms: Some(duration_ms),
        request_headers: Some(request_headers),
        request_body: request_body_text,
        response_headers: Some(response_headers),
        response_body: response_body_text,
        error_message,
        error_stack: None,
        identifier,
    };

    if let Err(err) = state.request_logs.insert(entry).await {
        tracing::warn!(error = %err, "failed to persist audit log entry");
    }

    Response::from_parts(parts, Body::from(response_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_endpoint_id_from_tenant_path() {
        assert_eq!(
            extract_endpoint_id("/scim/v2/endpoints/abc-123/Users"),
            Some("abc-123".to_string())
        );
        assert_eq!(extract_endpoint_id("/admin/endpoints"), None);
        assert_eq!(extract_endpoint_id("/healthz"), None);
    }

    #[test]
    fn prefers_member_value_for_member_patches() {
        let body = r#"{"schemas":["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations":[{"op":"add","path":"members","value":[{"value":"u-42"}]}]}"#;
        assert_eq!(
            extract_identifier(Some(body), None),
            Some("u-42".to_string())
        );
    }

    #[test]
    fn falls_back_to_response_user_name() {
        let response = r#"{"userName":"alice@example.com"}"#;
        assert_eq!(
            extract_identifier(None, Some(response)),
            Some("alice@example.com".to_string())
        );
    }

    #[test]
    fn truncate_does_not_split_a_multibyte_codepoint() {
        let body = "a".repeat(7) + "\u{1F600}\u{1F600}\u{1F600}";
        let truncated = truncate(body.as_bytes(), 8).unwrap();
        assert!(truncated.starts_with(&"a".repeat(7)));
        assert!(truncated.ends_with("... [truncated]"));
    }
}
