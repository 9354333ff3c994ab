use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures raised by a [`crate::users::repo::UserStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::UniqueViolation,
            _ => Self::Sqlx(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced at the HTTP boundary as `{ "error": "..." }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// `action` completes the client message, e.g. "fetch users".
    #[error("Failed to {action}")]
    Store {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn store(action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { action, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store { action, source } = &self {
            error!(error = %source, action, "store failure");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            ApiError::Validation("Email is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("User not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        let err = ApiError::store("fetch users")(StoreError::Unavailable("down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_message_hides_source() {
        let err = ApiError::store("create user")(StoreError::Unavailable("pool timed out".into()));
        assert_eq!(err.to_string(), "Failed to create user");
    }

    #[tokio::test]
    async fn response_body_carries_error_message() {
        let response = ApiError::NotFound("User not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "User not found");
    }
}
