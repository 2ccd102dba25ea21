//! The tenant router: resolves an `Endpoint` from the `/endpoints/{id}/...`
//! path segment, enforces `active`, and builds the per-request
//! [`TenantRequestContext`] carried into every SCIM handler.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::engine::tenant_config::TenantConfig;
use crate::error::ApiError;
use crate::store::endpoints::Endpoint;
use crate::AppState;

/// Request-scoped context built by the tenant router, available to every
/// downstream SCIM handler for the duration of the request only.
#[derive(Debug, Clone)]
pub struct TenantRequestContext {
    pub endpoint: Endpoint,
    pub base_url: String,
    pub config: TenantConfig,
}

impl TenantRequestContext {
    pub fn endpoint_id(&self) -> &str {
        &self.endpoint.id
    }

    /// `<apiPrefix>/v2` base for this tenant: the advertised path prefix
    /// always carries the `/v2` segment the edge strips from inbound
    /// requests, regardless of whether the caller used it.
    pub fn resource_base_url(&self, api_prefix: &str) -> String {
        format!(
            "{}/{}/v2/endpoints/{}",
            self.base_url, api_prefix, self.endpoint.id
        )
    }
}

/// Derives the externally-visible scheme+host from forwarding headers when
/// present, else fails back to the `Host` header.
fn derive_base_url(headers: &HeaderMap) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}

impl FromRequestParts<Arc<AppState>> for TenantRequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<std::collections::HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Scim(
                axum::http::StatusCode::NOT_FOUND,
                Some(crate::error::ScimErrorType::NoTarget),
                "missing endpoint id in path".to_string(),
            ))?;

        let endpoint_id = params
            .get("endpoint_id")
            .cloned()
            .ok_or_else(|| ApiError::Scim(
                axum::http::StatusCode::NOT_FOUND,
                Some(crate::error::ScimErrorType::NoTarget),
                "missing endpoint id in path".to_string(),
            ))?;

        let endpoint = state
            .endpoints
            .get(&endpoint_id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or_else(|| ApiError::Scim(
                axum::http::StatusCode::NOT_FOUND,
                Some(crate::error::ScimErrorType::NoTarget),
                format!("no endpoint '{endpoint_id}'"),
            ))?;

        if !endpoint.active {
            return Err(ApiError::EndpointInactive(endpoint.id));
        }

        let config = TenantConfig::from_json(&endpoint.config).map_err(ApiError::from)?;
        let base_url = derive_base_url(&parts.headers);

        Ok(TenantRequestContext {
            endpoint,
            base_url,
            config,
        })
    }
}
