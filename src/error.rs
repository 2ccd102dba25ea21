//! Error types and the SCIM error envelope (RFC 7644 section 3.12).
//!
//! `ScimError` is the typed, internal error surface that every component in
//! this crate (store, filter, patch engine, resource engine) raises.
//! `ApiError` is the HTTP-facing translation boundary: a single
//! `axum::response::IntoResponse` implementation that maps every `ScimError`
//! (and a handful of infrastructure errors) onto the error envelope,
//! mirroring how the SCIM server crate this one is built from keeps a
//! request-level error type separate from its domain error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::http::envelope::with_scim_content_type;
use crate::store::StoreError;

/// The `scimType` values defined by RFC 7644 section 3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    Uniqueness,
    InvalidFilter,
    InvalidSyntax,
    InvalidPath,
    NoTarget,
    InvalidValue,
    Mutability,
    VersionMismatch,
    TooMany,
    Sensitive,
    InvalidToken,
}

impl ScimErrorType {
    fn as_str(self) -> &'static str {
        match self {
            ScimErrorType::Uniqueness => "uniqueness",
            ScimErrorType::InvalidFilter => "invalidFilter",
            ScimErrorType::InvalidSyntax => "invalidSyntax",
            ScimErrorType::InvalidPath => "invalidPath",
            ScimErrorType::NoTarget => "noTarget",
            ScimErrorType::InvalidValue => "invalidValue",
            ScimErrorType::Mutability => "mutability",
            ScimErrorType::VersionMismatch => "versionMismatch",
            ScimErrorType::TooMany => "tooMany",
            ScimErrorType::Sensitive => "sensitive",
            ScimErrorType::InvalidToken => "invalidToken",
        }
    }
}

/// Business-logic-level error raised by the resource engine, patch engine,
/// and filter parser. Does not know about HTTP; see [`ApiError`] for that.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    #[error("uniqueness violation: {detail}")]
    Uniqueness { detail: String },

    #[error("invalid filter: {detail}")]
    InvalidFilter { detail: String },

    #[error("invalid syntax: {detail}")]
    InvalidSyntax { detail: String },

    #[error("invalid path: {detail}")]
    InvalidPath { detail: String },

    #[error("no such target: {detail}")]
    NoTarget { detail: String },

    #[error("invalid value: {detail}")]
    InvalidValue { detail: String },

    #[error("immutable attribute: {detail}")]
    Mutability { detail: String },

    #[error("version mismatch")]
    VersionMismatch,

    #[error("result set too large: {detail}")]
    TooMany { detail: String },

    #[error("endpoint {endpoint_id} is inactive")]
    EndpointInactive { endpoint_id: String },

    #[error("authentication failed: {detail}")]
    InvalidToken { detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ScimError {
    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            detail: detail.into(),
        }
    }

    pub fn invalid_path(detail: impl Into<String>) -> Self {
        Self::InvalidPath {
            detail: detail.into(),
        }
    }

    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        Self::InvalidFilter {
            detail: detail.into(),
        }
    }

    pub fn no_target(detail: impl Into<String>) -> Self {
        Self::NoTarget {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScimErrorBody {
    schemas: Vec<&'static str>,
    status: String,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    scim_type: Option<&'static str>,
    detail: String,
}

/// The HTTP-facing error type every handler returns. Every variant knows its
/// status code and, where applicable, its `scimType`.
#[derive(Debug)]
pub enum ApiError {
    Scim(StatusCode, Option<ScimErrorType>, String),
    /// Inactive-tenant rejection: 403 carries no `scimType`.
    EndpointInactive(String),
    PayloadTooLarge,
    Internal(String),
}

impl From<ScimError> for ApiError {
    fn from(err: ScimError) -> Self {
        match err {
            ScimError::Uniqueness { detail } => {
                ApiError::Scim(StatusCode::CONFLICT, Some(ScimErrorType::Uniqueness), detail)
            }
            ScimError::InvalidFilter { detail } => ApiError::Scim(
                StatusCode::BAD_REQUEST,
                Some(ScimErrorType::InvalidFilter),
                detail,
            ),
            ScimError::InvalidSyntax { detail } => ApiError::Scim(
                StatusCode::BAD_REQUEST,
                Some(ScimErrorType::InvalidSyntax),
                detail,
            ),
            ScimError::InvalidPath { detail } => ApiError::Scim(
                StatusCode::BAD_REQUEST,
                Some(ScimErrorType::InvalidPath),
                detail,
            ),
            ScimError::NoTarget { detail } => {
                ApiError::Scim(StatusCode::NOT_FOUND, Some(ScimErrorType::NoTarget), detail)
            }
            ScimError::InvalidValue { detail } => ApiError::Scim(
                StatusCode::BAD_REQUEST,
                Some(ScimErrorType::InvalidValue),
                detail,
            ),
            ScimError::Mutability { detail } => ApiError::Scim(
                StatusCode::BAD_REQUEST,
                Some(ScimErrorType::Mutability),
                detail,
            ),
            ScimError::VersionMismatch => ApiError::Scim(
                StatusCode::PRECONDITION_FAILED,
                Some(ScimErrorType::VersionMismatch),
                "resource has been modified".to_string(),
            ),
            ScimError::TooMany { detail } => {
                ApiError::Scim(StatusCode::BAD_REQUEST, Some(ScimErrorType::TooMany), detail)
            }
            ScimError::EndpointInactive { endpoint_id } => {
                ApiError::EndpointInactive(endpoint_id)
            }
            ScimError::InvalidToken { detail } => ApiError::Scim(
                StatusCode::UNAUTHORIZED,
                Some(ScimErrorType::InvalidToken),
                detail,
            ),
            ScimError::Store(store_err) => store_err.into(),
            ScimError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { detail } => {
                ApiError::Scim(StatusCode::CONFLICT, Some(ScimErrorType::Uniqueness), detail)
            }
            StoreError::NotFound => ApiError::Scim(
                StatusCode::NOT_FOUND,
                Some(ScimErrorType::NoTarget),
                "not found".to_string(),
            ),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, scim_type, detail) = match self {
            ApiError::Scim(status, scim_type, detail) => (status, scim_type, detail),
            ApiError::EndpointInactive(endpoint_id) => (
                StatusCode::FORBIDDEN,
                None,
                format!("endpoint {endpoint_id} is not active"),
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                None,
                "request body exceeds the configured limit".to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "unhandled internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "an internal error occurred".to_string(),
                )
            }
        };

        let body = ScimErrorBody {
            schemas: vec!["urn:ietf:params:scim:api:messages:2.0:Error"],
            status: status.as_u16().to_string(),
            scim_type: scim_type.map(ScimErrorType::as_str),
            detail,
        };

        with_scim_content_type((status, Json(body)).into_response())
    }
}
