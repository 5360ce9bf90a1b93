//! HTTP error handling and response types.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db::repository::RepositoryError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn maybe_details(mut self, details: Option<&String>) -> Self {
        self.details = details.cloned();
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    /// Malformed or invalid request
    BadRequest(String),
    Repository(RepositoryError),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ApiError) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("VALIDATION_ERROR", msg),
            ),
            AppError::Repository(e) => repository_status(e),
        }
    }
}

fn repository_status(err: RepositoryError) -> (StatusCode, ApiError) {
    match &err {
        RepositoryError::ValidationError { message, context } => (
            StatusCode::BAD_REQUEST,
            ApiError::new("VALIDATION_ERROR", message.clone())
                .maybe_details(context.details.as_ref()),
        ),
        RepositoryError::NotFound { message, .. } => {
            (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message.clone()))
        }
        RepositoryError::Conflict { message, context } => {
            let code = if context.entity.as_deref() == Some("card") {
                "CARD_IN_USE"
            } else {
                "CONFLICT"
            };
            (
                StatusCode::CONFLICT,
                ApiError::new(code, message.clone()).maybe_details(context.details.as_ref()),
            )
        }
        _ => {
            error!(error = %err, "repository failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("REPOSITORY_ERROR", "Storage operation failed")
                    .with_details(err.to_string()),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_card_conflict_maps_to_409() {
        let err = RepositoryError::conflict_with_context(
            "Card C1 already in use",
            ErrorContext::new("check_card")
                .with_entity("card")
                .with_details("registered for vehicle 30A-12345"),
        );
        let (status, body) = AppError::from(err).status_and_body();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "CARD_IN_USE");
        assert_eq!(body.details.as_deref(), Some("registered for vehicle 30A-12345"));
    }

    #[test]
    fn test_store_failure_carries_details() {
        let err = RepositoryError::connection_with_context(
            "pool exhausted",
            ErrorContext::new("get_connection"),
        );
        let (status, body) = AppError::from(err).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "REPOSITORY_ERROR");
        assert!(body.details.unwrap().contains("pool exhausted"));
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = RepositoryError::validation_with_context(
            "cameraId is required",
            ErrorContext::new("handle_entry").with_entity("cameraId"),
        );
        let (status, body) = AppError::from(err).status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(body.message, "cameraId is required");
    }
}
