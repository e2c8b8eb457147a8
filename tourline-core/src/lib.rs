pub mod catalog;
pub mod holds;
pub mod notification;
pub mod reviews;

use std::fmt;
use tourline_shared::DateParseError;

/// Failure taxonomy shared by every service operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{0}")]
    InvalidDate(String),
    #[error("{service} unavailable: {message}")]
    DependencyFailure { service: String, message: String },
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(kind: &str, id: impl fmt::Display) -> Self {
        CoreError::NotFound(format!("{} not found: {}", kind, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError(message.into())
    }

    pub fn dependency(service: &str, message: impl fmt::Display) -> Self {
        CoreError::DependencyFailure {
            service: service.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}

impl From<DateParseError> for CoreError {
    fn from(err: DateParseError) -> Self {
        CoreError::InvalidDate(err.to_string())
    }
}

/// Parse an identifier supplied by a caller, reporting malformed input as a validation error.
pub fn parse_id(kind: &str, raw: &str) -> CoreResult<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim())
        .map_err(|_| CoreError::validation(format!("Invalid {} ID format: {}", kind, raw)))
}
