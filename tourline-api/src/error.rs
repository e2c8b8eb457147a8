use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tourline_core::CoreError;
use tourline_shared::DateParseError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Dependency(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::ValidationError(msg) => AppError::Validation(msg),
            CoreError::InvalidDate(msg) => AppError::Validation(msg),
            e @ CoreError::DependencyFailure { .. } => AppError::Dependency(e.to_string()),
            e @ CoreError::PersistenceFailure(_) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<DateParseError> for AppError {
    fn from(err: DateParseError) -> Self {
        AppError::from(CoreError::from(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::Dependency(msg) => {
                tracing::error!("Dependency failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "dependency_failure",
                    "A required service is unavailable".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status_codes() {
        let cases = [
            (CoreError::not_found("Tour", "x"), StatusCode::NOT_FOUND),
            (CoreError::validation("bad"), StatusCode::BAD_REQUEST),
            (CoreError::InvalidDate("Invalid date format: x".into()), StatusCode::BAD_REQUEST),
            (CoreError::dependency("tours-service", "timeout"), StatusCode::INTERNAL_SERVER_ERROR),
            (CoreError::PersistenceFailure("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
