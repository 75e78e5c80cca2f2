use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::evaluation::cancel::Cancelled;
use crate::models::source::SourceFactsError;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Detector or generative-service failure, with stage and target context.
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Source facts error: {0}")]
    SourceFacts(#[from] SourceFactsError),

    #[error("Attempt cancelled")]
    Cancelled,

    #[error("Attempt exceeded its {0}s budget")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<Cancelled> for AppError {
    fn from(_: Cancelled) -> Self {
        AppError::Cancelled
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR", msg.clone())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::SourceFacts(e) => {
                tracing::error!("Source facts error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SOURCE_FACTS_ERROR",
                    e.to_string(),
                )
            }
            // 499 is the conventional "client closed request" status.
            AppError::Cancelled => (
                StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
                "CANCELLED",
                "The attempt was cancelled".to_string(),
            ),
            AppError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                format!("The attempt did not finish within {secs}s"),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).parts().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("x".into()).parts().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Llm("x".into()).parts().0, StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Timeout(300).parts().0, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(AppError::Cancelled.parts().0.as_u16(), 499);
    }

    #[test]
    fn test_cancelled_converts() {
        let err: AppError = Cancelled.into();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let err = AppError::Storage(StorageError::Walk {
            root: "/secret/path".into(),
            message: "boom".into(),
        });
        let (_, code, message) = err.parts();
        assert_eq!(code, "STORAGE_ERROR");
        assert!(!message.contains("/secret/path"));
    }
}
