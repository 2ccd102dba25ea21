//! Discovery documents: `ServiceProviderConfig`, `ResourceTypes`, and
//! `Schemas`, served read-only and identically for every tenant.
//!
//! `ServiceProviderConfig`/`AuthenticationScheme` mirror the shape the
//! upstream library used for its own discovery document (flat capability
//! booleans with dotted-key renames for the nested bulk/filter limits)
//! rather than RFC 7644's nested-object form, kept here standalone instead
//! of pulled in from the library's generic server builder.

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::http::envelope::with_scim_content_type;
use crate::schema::embedded;
use crate::tenant::TenantRequestContext;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceProviderConfig {
    #[serde(rename = "patch")]
    pub patch_supported: bool,
    #[serde(rename = "bulk")]
    pub bulk_supported: bool,
    #[serde(rename = "filter")]
    pub filter_supported: bool,
    #[serde(rename = "changePassword")]
    pub change_password_supported: bool,
    #[serde(rename = "sort")]
    pub sort_supported: bool,
    #[serde(rename = "etag")]
    pub etag_supported: bool,
    #[serde(rename = "authenticationSchemes")]
    pub authentication_schemes: Vec<AuthenticationScheme>,
    #[serde(rename = "bulk.maxOperations")]
    pub bulk_max_operations: Option<u32>,
    #[serde(rename = "bulk.maxPayloadSize")]
    pub bulk_max_payload_size: Option<u64>,
    #[serde(rename = "filter.maxResults")]
    pub filter_max_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticationScheme {
    pub name: String,
    pub description: String,
    #[serde(rename = "specUri")]
    pub spec_uri: Option<String>,
    #[serde(rename = "documentationUri")]
    pub documentation_uri: Option<String>,
    #[serde(rename = "type")]
    pub auth_type: String,
    pub primary: bool,
}

/// Every capability this crate actually implements: PATCH, filtering (the
/// `attr eq "value"` subset), and ETags. Bulk, password change, and sort
/// are explicit non-goals and stay `false`.
fn service_provider_config() -> ServiceProviderConfig {
    ServiceProviderConfig {
        patch_supported: true,
        bulk_supported: false,
        filter_supported: true,
        change_password_supported: false,
        sort_supported: false,
        etag_supported: true,
        authentication_schemes: vec![
            AuthenticationScheme {
                name: "Bearer Token".to_string(),
                description: "Authentication via a pre-shared bearer token".to_string(),
                spec_uri: Some("https://www.rfc-editor.org/info/rfc6750".to_string()),
                documentation_uri: None,
                auth_type: "httpbearer".to_string(),
                primary: true,
            },
            AuthenticationScheme {
                name: "OAuth Bearer Token".to_string(),
                description: "Authentication via an OAuth-issued JWT bearer token".to_string(),
                spec_uri: Some("https://www.rfc-editor.org/info/rfc6749".to_string()),
                documentation_uri: None,
                auth_type: "oauth2".to_string(),
                primary: false,
            },
        ],
        bulk_max_operations: None,
        bulk_max_payload_size: None,
        filter_max_results: Some(200),
    }
}

pub async fn service_provider_config_handler(_tenant: TenantRequestContext) -> Response {
    with_scim_content_type(axum::Json(service_provider_config()).into_response())
}

fn resource_type_document(name: &str, endpoint: &str, schema: &str) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ResourceType"],
        "id": name,
        "name": name,
        "endpoint": endpoint,
        "description": format!("{name} Account"),
        "schema": schema,
        "schemaExtensions": [],
    })
}

pub async fn resource_types_handler(_tenant: TenantRequestContext) -> Response {
    let types = vec![
        resource_type_document("User", "/Users", "urn:ietf:params:scim:schemas:core:2.0:User"),
        resource_type_document("Group", "/Groups", "urn:ietf:params:scim:schemas:core:2.0:Group"),
    ];
    with_scim_content_type(
        axum::Json(json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
            "totalResults": types.len(),
            "Resources": types,
        }))
        .into_response(),
    )
}

pub async fn schemas_handler(_tenant: TenantRequestContext) -> Response {
    let schemas: Vec<Value> = vec![
        serde_json::from_str(embedded::core_user_schema()).expect("embedded schema is valid JSON"),
        serde_json::from_str(embedded::core_group_schema()).expect("embedded schema is valid JSON"),
    ];
    with_scim_content_type(
        axum::Json(json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
            "totalResults": schemas.len(),
            "Resources": schemas,
        }))
        .into_response(),
    )
}
