use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::GatewayError;
use crate::routes::MAX_BODY_BYTES;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Input rejected before reaching the AI (gibberish, bad length).
    #[error("Invalid skill format: {0}")]
    InvalidSkillFormat(String),

    /// The AI judged the requested skill not to be a real topic.
    #[error("Invalid skill")]
    InvalidSkill,

    #[error("No file uploaded: {0}")]
    NoFile(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Payload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("AI error: {0}")]
    Ai(#[from] GatewayError),

    #[error("Vision analysis failed: {0}")]
    Vision(GatewayError),

    /// An upload was accepted but no text could be read from it.
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(MAX_BODY_BYTES),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::UnsupportedMedia(
                "Expected a request with Content-Type: application/json".to_string(),
            ),
            _ => AppError::Validation(rejection.body_text()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(MAX_BODY_BYTES)
        } else {
            tracing::warn!("Malformed multipart upload: {}", e.body_text());
            AppError::Validation("Malformed multipart upload".to_string())
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidSkillFormat(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_SKILL_FORMAT", msg.clone())
            }
            AppError::InvalidSkill => (
                StatusCode::BAD_REQUEST,
                "INVALID_SKILL",
                "This doesn't look like a real skill or topic. Try something like 'Docker', 'Python', or 'System Design'.".to_string(),
            ),
            AppError::NoFile(msg) => (StatusCode::BAD_REQUEST, "NO_FILE", msg.clone()),
            AppError::UnsupportedMedia(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA",
                msg.clone(),
            ),
            AppError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("Upload exceeds the {} MiB limit.", limit / (1024 * 1024)),
            ),
            AppError::Ai(e) => {
                tracing::error!("AI gateway error: {e}");
                match e {
                    GatewayError::Decode(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal server error occurred".to_string(),
                    ),
                    GatewayError::Fatal { .. } => (
                        StatusCode::BAD_GATEWAY,
                        "AI_REQUEST_REJECTED",
                        "The AI service rejected the request.".to_string(),
                    ),
                    _ if e.is_shape_exhaustion() => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "AI_INVALID_SHAPE",
                        "The AI returned an unexpected data format. Please try again.".to_string(),
                    ),
                    _ => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "AI_UNAVAILABLE",
                        "Service Unavailable. Please try again.".to_string(),
                    ),
                }
            }
            AppError::Vision(e) => {
                tracing::error!("Vision error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "VISION_ERROR",
                    "Failed to analyze image. All API keys may be at quota limit.".to_string(),
                )
            }
            AppError::UnreadableDocument(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNREADABLE_DOCUMENT",
                msg.clone(),
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "An upstream service failed. Please try again.".to_string(),
                )
            }
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
            "success": false,
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
    use crate::llm_client::classifier::AttemptError;
    use crate::llm_client::extractor::ExtractionError;
    use crate::llm_client::provider::ProviderError;

    async fn body_of(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let (status, body) = body_of(AppError::Validation("skill is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "skill is required");
    }

    #[tokio::test]
    async fn test_shape_exhaustion_maps_to_invalid_shape() {
        let error = AppError::Ai(GatewayError::Exhausted {
            attempts: 3,
            last: AttemptError::Extraction(ExtractionError::Shape {
                expected: "JSON array".into(),
                reason: "got object".into(),
            }),
        });
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "AI_INVALID_SHAPE");
    }

    #[tokio::test]
    async fn test_transport_exhaustion_maps_to_unavailable() {
        let error = AppError::Ai(GatewayError::Exhausted {
            attempts: 3,
            last: AttemptError::Provider(ProviderError::Network("reset".into())),
        });
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "AI_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let error = AppError::Ai(GatewayError::Fatal {
            attempt: 1,
            source: AttemptError::Provider(ProviderError::Status {
                status: 400,
                message: "key AIzaSecret rejected".into(),
            }),
        });
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "AI_REQUEST_REJECTED");
        assert!(!body.to_string().contains("AIzaSecret"));
    }

    #[tokio::test]
    async fn test_unreadable_document_is_unprocessable() {
        let (status, body) =
            body_of(AppError::UnreadableDocument("scanned image".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNREADABLE_DOCUMENT");
        assert_eq!(body["error"]["message"], "scanned image");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let (status, body) =
            body_of(AppError::Internal(anyhow::anyhow!("worker thread vanished"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("vanished"));
    }
}
