use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::interview::EngineError;

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

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InputTooShort { .. } | EngineError::NothingToRetry => {
                AppError::Validation(err.to_string())
            }
            EngineError::CallInFlight | EngineError::SessionComplete => {
                AppError::Conflict(err.to_string())
            }
            EngineError::Model(_) | EngineError::EmptyReaction { .. } => {
                AppError::Llm(err.to_string())
            }
            EngineError::TaskFailed(_) => AppError::Internal(anyhow::anyhow!(err.to_string())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "The coaching model could not be reached. Please try again.".to_string(),
                )
            }
            AppError::BadGateway(msg) => {
                tracing::error!("Bad gateway: {msg}");
                (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

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
    fn test_short_input_maps_to_bad_request() {
        let err: AppError = EngineError::InputTooShort { min: 20, actual: 4 }.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_in_flight_maps_to_conflict() {
        let err: AppError = EngineError::CallInFlight.into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_llm_error_hides_detail_behind_bad_gateway() {
        let err = AppError::Llm("proxy said 500".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
