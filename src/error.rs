// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{
    engine::{AttemptError, AttemptHistory},
    services::ServiceError,
    store::StoreError,
};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., answering a submitted attempt)
    Conflict(String),

    // 409 Conflict with the learner's history attached, so the client can show the best score
    MaxAttemptsReached {
        max_attempts: u32,
        history: AttemptHistory,
    },
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
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::MaxAttemptsReached {
                max_attempts,
                history,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Maximum Attempts Reached",
                    "max_attempts": max_attempts,
                    "total_attempts": history.total_attempts,
                    "best_score": history.best_score,
                    "passed": history.passed,
                }),
            ),
        };

        (status, Json(body)).into_response()
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

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Unexpected(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<AttemptError> for AppError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::MaxAttemptsExceeded {
                max_attempts,
                history,
            } => AppError::MaxAttemptsReached {
                max_attempts,
                history,
            },
            AttemptError::NoQuestions | AttemptError::UnknownQuestion(_) => {
                AppError::BadRequest(err.to_string())
            }
            AttemptError::AlreadyStarted | AttemptError::NotInProgress(_) => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::AssessmentNotFound { .. } | ServiceError::SessionNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ServiceError::Attempt(e) => e.into(),
            ServiceError::Store(e) => e.into(),
        }
    }
}
