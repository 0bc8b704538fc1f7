//! API error types.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use circle_db::DbError;
use circle_media::MediaError;
use circle_models::FieldErrors;

use crate::config::is_production_environment;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// A single-field validation error.
    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, msg))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::Database(DbError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(DbError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Media(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to clients. Variants carrying a plain message show it as is.
    fn detail(&self) -> String {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Validation(errors) => errors.summary(),
            _ => self.to_string(),
        }
    }
}

impl ApiError {
    /// Detail sent to clients. Production hides internal errors.
    fn public_detail(&self, production: bool) -> String {
        if production && self.status_code().is_server_error() {
            "An internal error occurred".to_string()
        } else {
            self.detail()
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

macro_rules! rejection_as_bad_request {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::BadRequest(rejection.body_text())
                }
            }
        )*
    };
}

rejection_as_bad_request!(JsonRejection, PathRejection, QueryRejection, MultipartRejection);

/// Error body: `detail` plus any per-field messages at the top level.
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(flatten)]
    errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let production = std::env::var("ENVIRONMENT")
            .map(|env| is_production_environment(&env))
            .unwrap_or(false);
        let detail = self.public_detail(production);

        let errors = match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        };

        (status, Json(ErrorResponse { detail, errors })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_errors_are_flattened() {
        let (status, body) =
            body_json(ApiError::field("non_field_errors", "Invalid credentials")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["non_field_errors"][0], "Invalid credentials");
        assert_eq!(body["detail"], "non_field_errors: Invalid credentials");
    }

    #[tokio::test]
    async fn test_plain_messages() {
        let (status, body) = body_json(ApiError::not_found("Post not found.")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"detail": "Post not found."}));
    }

    #[test]
    fn test_internal_detail_hidden_in_production() {
        let err = ApiError::internal("disk on fire");
        assert_eq!(err.public_detail(false), "Internal error: disk on fire");
        assert_eq!(err.public_detail(true), "An internal error occurred");
        assert_eq!(ApiError::not_found("Post not found.").public_detail(true), "Post not found.");
    }

    #[tokio::test]
    async fn test_database_errors_map_to_status() {
        let (status, _) = body_json(DbError::not_found("user 1").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = body_json(DbError::Conflict("dup".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = body_json(DbError::Poisoned.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
