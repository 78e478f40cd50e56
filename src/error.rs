// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error (storage and other infrastructure failures)
    InternalServerError(String),

    // 400 Bad Request (missing or malformed input)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 404 The quiz session does not exist or was deactivated
    SessionNotFound,

    // 410 The quiz session exists but its validity window has passed
    SessionExpired,

    // 410 Not found or expired, where the distinction isn't surfaced
    SessionInvalid,

    // 400 Identity verification policy not satisfied
    UnverifiedIdentity(String),

    // 404 Wrong, missing or already completed attempt
    InvalidAttempt,

    // 503 Certificate issuer failed; never surfaced from a submission
    IssuerUnavailable(String),
}

impl AppError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
            AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SessionNotFound => "SESSION_NOT_FOUND",
            AppError::SessionExpired => "SESSION_EXPIRED",
            AppError::SessionInvalid => "SESSION_INVALID",
            AppError::UnverifiedIdentity(_) => "UNVERIFIED_IDENTITY",
            AppError::InvalidAttempt => "INVALID_ATTEMPT",
            AppError::IssuerUnavailable(_) => "ISSUER_UNAVAILABLE",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                "Quiz session not found".to_string(),
            ),
            AppError::SessionExpired => (StatusCode::GONE, "Quiz session has expired".to_string()),
            AppError::SessionInvalid => (
                StatusCode::GONE,
                "Quiz session invalid or expired".to_string(),
            ),
            AppError::UnverifiedIdentity(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidAttempt => (StatusCode::NOT_FOUND, "Invalid attempt".to_string()),
            AppError::IssuerUnavailable(msg) => {
                tracing::warn!("Certificate issuer unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Certificate service unavailable".to_string(),
                )
            }
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
