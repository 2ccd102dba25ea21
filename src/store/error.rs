//! Store-level error type.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("unique constraint violated: {detail}")]
    UniqueViolation { detail: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Translates a raw `sqlx::Error` into a `StoreError`, recognizing SQLite's
/// unique-constraint violation code (2067 / "UNIQUE constraint failed") so
/// repositories can surface it as `StoreError::UniqueViolation` rather than a
/// bare database error. Every repository method that performs an insert or
/// update against a shadow-uniqueness column routes its sqlx error through
/// this function, so the engine layer can translate it into the RFC 7644
/// `uniqueness` SCIM error.
pub fn classify_write_error(err: sqlx::Error, detail: impl Into<String>) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("2067") || db_err.message().contains("UNIQUE") {
            return StoreError::UniqueViolation {
                detail: detail.into(),
            };
        }
    }
    StoreError::Sqlx(err)
}
