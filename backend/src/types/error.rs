//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portal_storage::GuardError;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::json;
use strum::Display;

use crate::document_storage::DocumentError;
use crate::jwt::error::JwtError;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The addressed record does not exist
    NotFound,
    /// The request clashes with the current state; refresh and retry
    Conflict,
    /// The request is malformed or references something invalid
    ValidationError,
    /// Missing or invalid credentials
    Unauthorized,
    /// The caller may not perform this action
    Forbidden,
    /// Unexpected failure
    InternalError,
}

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiErrorResponse {
    /// Error details
    error: ErrorBody,
}

/// Error body containing code, message and optional details
#[derive(Debug, Serialize, JsonSchema)]
struct ErrorBody {
    /// Machine-readable error code
    code: ErrorCode,
    /// Human-readable error message
    message: String,
    /// Structured context, e.g. the blocking dependents of a delete
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                error: ErrorBody {
                    code,
                    message: message.into(),
                    details: None,
                },
            },
        }
    }

    /// Attaches structured details
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.inner.error.details = Some(details);
        self
    }

    /// `404 NOT_FOUND`
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    /// `409 CONFLICT`
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ErrorCode::Conflict, message)
    }

    /// `400 VALIDATION_ERROR`
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    /// `401 UNAUTHORIZED`
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
    }

    /// `403 FORBIDDEN`
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }

    /// `500 INTERNAL_ERROR` with a generic message
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "Internal server error",
        )
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Error code of the error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.inner.error.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert guard and storage errors to application errors
impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::NotFound { entity, id } => Self::not_found(format!("{entity} not found"))
                .with_details(json!({ "entity": entity, "id": id })),
            GuardError::AlreadyExists { entity, id } => {
                Self::conflict(format!("{entity} already exists"))
                    .with_details(json!({ "entity": entity, "id": id }))
            }
            GuardError::ConcurrentModification => Self::conflict(
                "The record was modified by another request. Refresh and retry.",
            ),
            GuardError::ReferentialIntegrityViolation {
                dependents,
                message,
            } => Self::conflict(message).with_details(json!({ "dependents": dependents })),
            GuardError::MissingReference(message) => Self::validation(message),
            GuardError::TransactionFailed { reasons } => {
                tracing::error!(?reasons, "transaction cancelled");
                Self::internal()
            }
            err @ (GuardError::TransactionTooLarge { .. }
            | GuardError::Serialization(_)
            | GuardError::Store(_)) => {
                tracing::error!("storage error: {err}");
                Self::internal()
            }
        }
    }
}

/// Convert document storage errors to application errors
impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidContent(message) => Self::validation(message),
            err @ (DocumentError::S3Error(_) | DocumentError::UpstreamError(_)) => {
                tracing::error!("document storage error: {err}");
                Self::internal()
            }
        }
    }
}

/// Convert token errors to application errors
impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken => Self::unauthorized("Invalid or expired token"),
            err @ (JwtError::Signing(_) | JwtError::Secret(_)) => {
                tracing::error!("token error: {err}");
                Self::internal()
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    async fn body(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_violation_names_dependents() {
        let (status, json) = body(AppError::from(GuardError::ReferentialIntegrityViolation {
            dependents: "sub-industries".to_string(),
            message: "Cannot delete industry with existing sub-industries".to_string(),
        }))
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            json,
            json!({
                "error": {
                    "code": "CONFLICT",
                    "message": "Cannot delete industry with existing sub-industries",
                    "details": { "dependents": "sub-industries" }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict_without_details() {
        let (status, json) = body(GuardError::ConcurrentModification.into()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_storage_failures_hide_internals() {
        let (status, json) =
            body(GuardError::Serialization("bad attribute PK".to_string()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_not_found_status() {
        let error = AppError::from(GuardError::NotFound {
            entity: "Industry".to_string(),
            id: "i1".to_string(),
        });
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
