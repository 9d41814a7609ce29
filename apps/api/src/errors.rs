use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        missing_fields: Vec<String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Could not parse generated output: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// `{code, message}` shape handed to callers that are not HTTP handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            message: message.into(),
            missing_fields: vec![],
        }
    }

    pub fn missing_fields(fields: Vec<String>) -> Self {
        AppError::InvalidInput {
            message: "Missing required fields!".to_string(),
            missing_fields: fields,
        }
    }

    /// Wire code of the error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput { .. } => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Parse(_) => "PARSE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Internal(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn failure(&self) -> Failure {
        Failure {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Parse(_) | LlmError::EmptyContent => AppError::Parse(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(msg) => AppError::Conflict(msg),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error, details) = match &self {
            AppError::InvalidInput { message, .. } => (StatusCode::BAD_REQUEST, message.clone(), None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::Parse(msg) => {
                tracing::warn!("Unparseable generated output: {msg}");
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string(), None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    Some(e.to_string()),
                )
            }
        };

        let mut body = json!({
            "success": false,
            "code": code,
            "error": error,
        });
        if let AppError::InvalidInput { missing_fields, .. } = &self {
            if !missing_fields.is_empty() {
                body["missingFields"] = json!(missing_fields);
            }
        }
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_taxonomy() {
        assert_eq!(AppError::missing_fields(vec!["jobRole".into()]).code(), "INVALID_INPUT");
        assert_eq!(AppError::Parse("x".into()).code(), "PARSE_ERROR");
        assert_eq!(AppError::Upstream("x".into()).code(), "UPSTREAM_ERROR");
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).code(),
            "UNKNOWN_ERROR"
        );
    }

    #[test]
    fn test_llm_parse_errors_become_parse_error() {
        let err: AppError = LlmError::EmptyContent.into();
        assert_eq!(err.code(), "PARSE_ERROR");

        let err: AppError = LlmError::Api {
            status: 400,
            message: "bad".into(),
        }
        .into();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn test_failure_carries_message() {
        let failure = AppError::invalid_input("Missing required parameters!").failure();
        assert_eq!(failure.code, "INVALID_INPUT");
        assert_eq!(failure.message, "Missing required parameters!");
    }

    #[test]
    fn test_missing_fields_status_is_400() {
        let response = AppError::missing_fields(vec!["jobRole".into()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
