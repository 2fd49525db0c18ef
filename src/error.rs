use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error taxonomy, mapped onto HTTP statuses in `IntoResponse`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("upload failed: {0}")]
    Upload(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Upload(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        // Unique-constraint violations are surfaced as a Conflict, same as the
        // advisory pre-check; the constraint is the authoritative backstop.
        if let sqlx::Error::Database(ref db) = e {
            if db.code().as_deref() == Some("23505") {
                return AppError::Conflict("Username or email already in use".into());
            }
        }
        AppError::Database(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                json!({ "message": "Database error", "error": e.to_string() })
            }
            AppError::Upload(e) => {
                tracing::error!(error = %e, "upload failed");
                json!({ "message": "Upload failed", "error": e.to_string() })
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                json!({ "message": "Internal server error", "error": e.to_string() })
            }
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            AppError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Forbidden("no").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("missing").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::conflict("dup").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Database(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn non_unique_sqlx_error_stays_dependency_failure() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[derive(Debug)]
    struct StubDbError(&'static str);

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn unique_violation_at_write_time_becomes_conflict() {
        // Same Conflict kind as the advisory pre-check.
        let err: AppError = sqlx::Error::Database(Box::new(StubDbError("23505"))).into();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn other_sqlstate_codes_stay_dependency_failures() {
        let err: AppError = sqlx::Error::Database(Box::new(StubDbError("23503"))).into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
