use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;

/// Error response type
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-field validation messages, present only for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// This error type provides consistent error handling across all endpoints,
/// automatically mapping different error types to appropriate HTTP status codes
/// and formatting them as JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// Path segment is not a positive integer; treated as an unmatched route
    InvalidPk(String),
    /// No book stored under this pk
    BookNotFound(i64),
    /// Request body failed field validation
    Validation(FieldErrors),
    /// Body could not be read as JSON
    JsonRejection(JsonRejection),
    /// Database operation error
    DatabaseError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, fields) = match self {
            ApiError::InvalidPk(pk) => (
                StatusCode::NOT_FOUND,
                format!("Book not found: '{}' is not a valid book id", pk),
                None,
            ),
            ApiError::BookNotFound(pk) => (
                StatusCode::NOT_FOUND,
                format!("Book not found: {}", pk),
                None,
            ),
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(fields),
            ),
            ApiError::JsonRejection(rejection) => (
                rejection.status(),
                format!("JSON parse error: {}", rejection.body_text()),
                None,
            ),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", err),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            fields,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::JsonRejection(rejection)
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        ApiError::Validation(fields)
    }
}

/// Parse a `{pk}` path segment the way an integer route converter would.
pub fn parse_pk(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(pk) if pk > 0 && raw.bytes().all(|b| b.is_ascii_digit()) => Ok(pk),
        _ => Err(ApiError::InvalidPk(raw.to_string())),
    }
}
