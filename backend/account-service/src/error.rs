/// Error types for Account Service
///
/// `AccountError` is the client-facing taxonomy: every variant maps to a
/// status code and a `{"message": ...}` body. Infrastructure failures are
/// logged where they happen and surface only as the generic `*Failed`
/// variant of the flow that hit them.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AccountError>;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired verification link")]
    InvalidOrExpiredToken,

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Error registering user")]
    RegistrationFailed,

    #[error("Error during login")]
    LoginFailed,

    #[error("Error verifying user")]
    VerificationFailed,
}

/// Error body shared by every failing response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ResponseError for AccountError {
    fn status_code(&self) -> StatusCode {
        match self {
            AccountError::DuplicateEmail | AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::InvalidOrExpiredToken | AccountError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            AccountError::RegistrationFailed
            | AccountError::LoginFailed
            | AccountError::VerificationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            message: self.to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(err: validator::ValidationErrors) -> Self {
        let fields = err.field_errors();
        if fields.contains_key("email") {
            AccountError::Validation("A valid email address is required".to_string())
        } else if fields.contains_key("password") {
            AccountError::Validation("Password must not be empty".to_string())
        } else {
            AccountError::Validation(err.to_string())
        }
    }
}

/// Failures raised by `UserStore` / `VerificationTokenStore` implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated")]
    UniqueViolation,

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}
