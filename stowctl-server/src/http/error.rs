//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes:
//! `{"error": "<code>", "message": "<text>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::repos::DbError;
use crate::images::ImageError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Malformed request body or form (400)
    BadRequest { message: String },

    /// Upload extension not on the allow-list (400)
    InvalidFileType,

    /// A referenced label, parent item, state or tag doesn't exist (400)
    MissingReference,

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Image processing or storage error (500, logged)
    Image(ImageError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::BadRequest { .. }
            | Self::InvalidFileType
            | Self::MissingReference => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Image(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            Self::Validation(e) => ("validation_error", e.to_string()),
            Self::BadRequest { message } => ("bad_request", message.clone()),
            Self::InvalidFileType => ("invalid_file_type", "invalid file type".to_string()),
            Self::MissingReference => (
                "missing_reference",
                "referenced record does not exist".to_string(),
            ),
            Self::NotFound { resource, id } => {
                tracing::debug!(resource, id = %id, "Not found");
                ("not_found", format!("{resource} not found"))
            }
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("internal_error", e.to_string())
            }
            Self::Image(e) => {
                tracing::error!("Image error: {}", e);
                ("internal_error", e.to_string())
            }
        };

        let body = json!({
            "error": code,
            "message": message
        });

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        if e.is_missing_reference() {
            return Self::MissingReference;
        }
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            _ => Self::Database(e),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::InvalidFileType { filename } => {
                tracing::debug!(filename = %filename, "Rejected upload");
                Self::InvalidFileType
            }
            _ => Self::Image(e),
        }
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
    async fn validation_error_is_400() {
        let (status, body) =
            body_json(ApiError::Validation(ValidationError::Empty { field: "name" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "name cannot be empty");
    }

    #[tokio::test]
    async fn not_found_has_fixed_message() {
        let (status, body) = body_json(ApiError::NotFound {
            resource: "Item",
            id: "42".into(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Item not found");
    }

    #[tokio::test]
    async fn invalid_file_type_is_400() {
        let err = ApiError::from(ImageError::InvalidFileType {
            filename: "x.gif".into(),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid file type");
    }

    #[tokio::test]
    async fn server_errors_carry_underlying_message() {
        let err = ApiError::from(DbError::Sqlx(sqlx::Error::RowNotFound));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].as_str().unwrap().contains("no rows returned"));
    }

    #[test]
    fn db_not_found_maps_to_404() {
        let err = ApiError::from(DbError::not_found("Tag", 7));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
