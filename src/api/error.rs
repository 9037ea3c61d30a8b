use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::services::converter::ConversionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    /// The conversion tool ran and exited non-zero; carries its stderr.
    #[error("Conversion tool failed: {details}")]
    ToolFailed { details: String },

    /// The conversion tool could not be run to completion.
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<ConversionError> for AppError {
    fn from(e: ConversionError) -> Self {
        match e {
            ConversionError::ToolFailed { status, stderr } => {
                tracing::warn!("Conversion tool exited with {}", status);
                AppError::ToolFailed { details: stderr }
            }
            other => AppError::ConversionFailed(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg, None),
            AppError::ToolFailed { details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ffmpeg failed".to_string(),
                Some(details),
            ),
            AppError::ConversionFailed(details) => {
                tracing::error!("Conversion failed: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "conversion failed".to_string(),
                    Some(details),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::time::Duration;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_has_no_details() {
        let response = AppError::BadRequest("no file part".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "no file part");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_tool_failure_surfaces_stderr() {
        let err: AppError = ConversionError::ToolFailed {
            status: "exit status: 1".to_string(),
            stderr: "Unknown encoder 'xyz'".to_string(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "ffmpeg failed");
        assert_eq!(json["details"], "Unknown encoder 'xyz'");
    }

    #[tokio::test]
    async fn test_timeout_is_conversion_fault() {
        let err: AppError = ConversionError::TimedOut(Duration::from_secs(90)).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "conversion failed");
        assert!(json["details"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_internal_error_is_redacted() {
        let response = AppError::Internal("disk on fire".to_string()).into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal Server Error");
        assert!(json.get("details").is_none());
    }
}
