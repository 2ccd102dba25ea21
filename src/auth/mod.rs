//! Auth gate: validates the `Authorization: Bearer` credential against the
//! configured shared secret or an OAuth JWT, and attaches an authenticated
//! [`Principal`] to the request for downstream handlers.
//!
//! Mounted as an `axum::middleware::from_fn_with_state` layer over every
//! tenant-scoped and admin route; discovery routes and `/healthz` are
//! mounted outside this layer and never see it.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::http::envelope::with_scim_content_type;
use crate::AppState;

/// The two credential kinds accepted on `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub enum Principal {
    Legacy,
    OAuth { client_id: String, scope: String },
}

#[derive(Debug, Deserialize)]
struct OAuthClaims {
    client_id: String,
    #[serde(default)]
    scope: String,
}

fn unauthorized(detail: &str) -> Response {
    let body = serde_json::json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
        "status": "401",
        "scimType": "invalidToken",
        "detail": detail,
    });
    let mut response = with_scim_content_type((StatusCode::UNAUTHORIZED, axum::Json(body)).into_response());
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Bearer realm="SCIM""#),
    );
    response
}

fn extract_bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn decode_oauth(token: &str, signing_key: &str) -> Result<Principal, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<OAuthClaims>(
        token,
        &DecodingKey::from_secret(signing_key.as_bytes()),
        &validation,
    )?;
    Ok(Principal::OAuth {
        client_id: data.claims.client_id,
        scope: data.claims.scope,
    })
}

/// The bearer gate itself. Tries the shared secret first (constant-time
/// compare), then falls back to OAuth JWT verification.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(&request) else {
        return unauthorized("missing or malformed Authorization header");
    };

    if constant_time_eq(token, state.config.shared_secret.expose()) {
        request.extensions_mut().insert(Principal::Legacy);
        return next.run(request).await;
    }

    match decode_oauth(token, state.config.jwt_secret.expose()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(_) => unauthorized("invalid bearer token"),
    }
}
