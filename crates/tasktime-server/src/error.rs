//! API error responses.
//!
//! Every failure is rendered as `{"error": <message>, "kind": <kind>}`.
//! Storage failures keep their detail in the log and show a generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tasktime_db::DbError;
use tracing::error;

/// Error kinds visible to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    TimerAlreadyActive,
    InvalidTimerState,
    ValidationError,
    StorageError,
    Unauthenticated,
    InvalidCredentials,
    EmailTaken,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::TimerAlreadyActive | Self::InvalidTimerState | Self::ValidationError => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden | Self::Unauthenticated | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A request failure.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    /// Message safe to show to clients.
    pub message: String,
    /// Logged, never sent.
    internal: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::InvalidCredentials, "Invalid email or password")
    }

    /// Logs `details` and hides them behind a generic message.
    pub fn internal(details: impl Into<String>) -> Self {
        let details = details.into();
        error!(error = %details, "internal error");
        Self {
            kind: ErrorKind::StorageError,
            message: "An internal error occurred".to_string(),
            internal: Some(details),
        }
    }

    pub fn internal_details(&self) -> Option<&str> {
        self.internal.as_deref()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            kind: self.kind,
        };
        (self.kind.status(), Json(body)).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(e) => Self::validation(e.to_string()),
            DbError::TaskNotFound(_) => Self::new(ErrorKind::NotFound, "Task not found"),
            DbError::Forbidden(_) => {
                Self::new(ErrorKind::Forbidden, "Not authorized to access this task")
            }
            DbError::TimerAlreadyActive => Self::new(
                ErrorKind::TimerAlreadyActive,
                "A task is already being tracked. Please stop it first.",
            ),
            DbError::InvalidTimerState(_) => {
                Self::new(ErrorKind::InvalidTimerState, "Invalid request")
            }
            DbError::EmailTaken(_) => {
                Self::new(ErrorKind::EmailTaken, "Email is already registered")
            }
            err @ (DbError::Sqlite(_)
            | DbError::TimestampParse { .. }
            | DbError::InvalidRecord { .. }
            | DbError::TaskTotalNotUpdated { .. }) => Self::internal(err.to_string()),
        }
    }
}

impl From<tasktime_core::ValidationError> for AppError {
    fn from(err: tasktime_core::ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}
