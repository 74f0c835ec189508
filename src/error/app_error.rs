use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Why a request could not be tied to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    UnknownSubject,
}

impl AuthFailure {
    fn status(self) -> StatusCode {
        match self {
            AuthFailure::MissingToken => StatusCode::UNAUTHORIZED,
            AuthFailure::InvalidToken => StatusCode::BAD_REQUEST,
            // 419 is not in the IANA registry but is the common "session expired" status.
            AuthFailure::ExpiredToken => {
                StatusCode::from_u16(419).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            AuthFailure::UnknownSubject => StatusCode::NOT_FOUND,
        }
    }

    fn code(self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "TOKEN_MISSING",
            AuthFailure::InvalidToken => "TOKEN_INVALID",
            AuthFailure::ExpiredToken => "TOKEN_EXPIRED",
            AuthFailure::UnknownSubject => "USER_NOT_FOUND",
        }
    }

    fn message(self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Session token is missing",
            AuthFailure::InvalidToken => "Session token is invalid",
            AuthFailure::ExpiredToken => "Session token has expired",
            AuthFailure::UnknownSubject => "Session user no longer exists",
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    // Database errors
    Database(sqlx::Error),

    // Authentication
    Unauthenticated(AuthFailure),
    InvalidCredentials(String),

    // Resource errors
    NotFound(String),
    Conflict(String),

    // Validation errors
    BadRequest(String),
    InvalidField { field: String, reason: String },
    Unprocessable(String),
    PayloadTooLarge(String),

    // Internal errors
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Unauthenticated(failure) => {
                write!(f, "Unauthenticated: {}", failure.message())
            }
            AppError::InvalidCredentials(msg) => write!(f, "Invalid credentials: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidField { field, reason } => {
                write!(f, "Validation error: `{}` {}", field, reason)
            }
            AppError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Stable identifier carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Unauthenticated(failure) => failure.code(),
            AppError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidField { .. } => "VALIDATION_ERROR",
            AppError::Unprocessable(_) => "UNPROCESSABLE",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated(failure) => failure.status(),
            AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, field) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("database error".to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Server Error".to_string(), None)
            }
            AppError::Unauthenticated(failure) => (failure.message().to_string(), None),
            AppError::InvalidField { field, reason } => (reason, Some(field)),
            AppError::InvalidCredentials(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::Unprocessable(msg)
            | AppError::PayloadTooLarge(msg) => (msg, None),
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

// From implementations for automatic conversion
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            return AppError::Conflict("Resource already exists".to_string());
        }
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Data not found".to_string()),
            _ => AppError::Database(err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parse error: {}", err))
    }
}

/// True when the storage engine rejected a write on a UNIQUE constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

/// Name of the violated constraint target, e.g. `pages.name`, when SQLite reports one.
pub fn unique_violation_target(err: &sqlx::Error) -> Option<String> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    db_err
        .message()
        .strip_prefix("UNIQUE constraint failed: ")
        .map(|target| target.trim().to_string())
}
