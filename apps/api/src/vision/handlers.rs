//! Axum route handler and pipeline for screenshot critique.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::with_json_instruction;
use crate::llm_client::{Gateway, GenerationSettings, InlineImage, LogicalRequest, Prompt, ShapeContract};
use crate::state::AppState;
use crate::vision::prompts::CRITIQUE_PROMPT;

pub const SCREENSHOT_FIELD: &str = "screenshot";

const MIN_ATTEMPTS: u32 = 3;

const CRITIQUE_SETTINGS: GenerationSettings = GenerationSettings {
    temperature: 0.5,
    max_output_tokens: 900,
};

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoDetails {
    pub background: Option<String>,
    pub lighting: Option<String>,
    pub framing: Option<String>,
    pub attire: Option<String>,
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoReport {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub quality_score: Option<u8>,
    #[serde(default)]
    pub helpful_data: PhotoDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCritique {
    pub visual_score: u8,
    pub critique: String,
    pub headline_suggestion: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub photo_report: Option<PhotoReport>,
}

#[derive(Debug, Serialize)]
pub struct CritiqueResponse {
    pub success: bool,
    pub data: ProfileCritique,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub fn critique_contract() -> ShapeContract {
    ShapeContract::object_with_keys(&["visual_score", "critique", "headline_suggestion"])
        .and(ShapeContract::integer_field("visual_score", 0..=100))
}

/// Each credential gets at least one chance before the upload is given up on.
pub async fn critique_screenshot(
    gateway: &Gateway,
    image: InlineImage,
    cancel: &CancellationToken,
) -> Result<ProfileCritique, AppError> {
    info!(
        "Critiquing screenshot: {} ({} bytes)",
        image.mime_type,
        image.data.len()
    );

    let prompt = Prompt::text(with_json_instruction(CRITIQUE_PROMPT))
        .with_image(image)
        .with_settings(CRITIQUE_SETTINGS);

    let max_attempts = (gateway.pool_size() as u32).max(MIN_ATTEMPTS);
    let request = LogicalRequest::new(prompt, critique_contract()).with_max_attempts(max_attempts);

    gateway
        .execute_as::<ProfileCritique>(request, cancel)
        .await
        .map_err(AppError::Vision)
}

/// Pulls the screenshot field out of a multipart body. Other fields are skipped.
pub async fn read_screenshot(multipart: &mut Multipart) -> Result<InlineImage, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(SCREENSHOT_FIELD) {
            continue;
        }

        let mime_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(AppError::UnsupportedMedia(format!(
                "Expected an image upload, got '{mime_type}'"
            )));
        }

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AppError::NoFile("Uploaded screenshot is empty.".to_string()));
        }

        return Ok(InlineImage { mime_type, data });
    }

    Err(AppError::NoFile("Image screenshot is required.".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/linkedin
///
/// Multipart upload with a `screenshot` image field.
pub async fn handle_critique_profile(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CritiqueResponse>, AppError> {
    let image = read_screenshot(&mut multipart).await?;
    let cancel = state.shutdown.child_token();
    let data = critique_screenshot(&state.gateway, image, &cancel).await?;

    Ok(Json(CritiqueResponse {
        success: true,
        data,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::llm_client::executor::RetryPolicy;
    use crate::llm_client::pool::CredentialPool;
    use crate::llm_client::provider::testing::{rate_limited, ScriptedProvider};

    const CRITIQUE: &str = r#"{
  "visual_score": 62,
  "critique": "Headline lacks industry keywords | No custom banner",
  "headline_suggestion": "Backend Engineer | Rust, Postgres, Distributed Systems",
  "action_items": ["Add a banner", "Rewrite the About section"],
  "photo_report": {
    "strengths": ["Good lighting"],
    "issues": ["Busy background"],
    "suggestions": ["Blur the background"],
    "quality_score": 70,
    "helpful_data": {"background": "busy", "lighting": "good"}
  }
}"#;

    fn png() -> InlineImage {
        InlineImage {
            mime_type: "image/png".to_string(),
            data: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
        }
    }

    fn gateway_with(provider: ScriptedProvider, keys: &[&str]) -> (Gateway, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let gateway = Gateway::new(
            provider.clone(),
            CredentialPool::new(keys.iter().copied()).unwrap(),
            RetryPolicy::default(),
        );
        (gateway, provider)
    }

    #[tokio::test(start_paused = true)]
    async fn test_critique_from_model() {
        let (gateway, _) = gateway_with(ScriptedProvider::always(CRITIQUE), &["K1"]);

        let critique = critique_screenshot(&gateway, png(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(critique.visual_score, 62);
        assert_eq!(critique.action_items.len(), 2);
        let photo = critique.photo_report.unwrap();
        assert_eq!(photo.quality_score, Some(70));
        assert_eq!(photo.helpful_data.background.as_deref(), Some("busy"));
        assert!(photo.helpful_data.attire.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_photo_report_is_optional() {
        let (gateway, _) = gateway_with(
            ScriptedProvider::always(
                r#"{"visual_score": 40, "critique": "No photo", "headline_suggestion": "Engineer"}"#,
            ),
            &["K1"],
        );

        let critique = critique_screenshot(&gateway, png(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(critique.photo_report.is_none());
        assert!(critique.action_items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_on_every_key_is_vision_error() {
        let (gateway, provider) =
            gateway_with(ScriptedProvider::new(|_, _| Err(rate_limited())), &["K1", "K2", "K3"]);

        let err = critique_screenshot(&gateway, png(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Vision(_)));
        assert_eq!(provider.calls(), vec!["K1", "K2", "K3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_pool_tries_every_key() {
        let keys = ["K1", "K2", "K3", "K4", "K5"];
        let (gateway, provider) = gateway_with(
            ScriptedProvider::new(|key, _| {
                if key == "K5" {
                    Ok(CRITIQUE.to_string())
                } else {
                    Err(rate_limited())
                }
            }),
            &keys,
        );

        let critique = critique_screenshot(&gateway, png(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(critique.visual_score, 62);
        assert_eq!(provider.calls(), keys);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_score_is_rejected() {
        let (gateway, provider) = gateway_with(
            ScriptedProvider::always(
                r#"{"visual_score": 180, "critique": "x", "headline_suggestion": "y"}"#,
            ),
            &["K1"],
        );

        let err = critique_screenshot(&gateway, png(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            AppError::Vision(e) => assert!(e.is_shape_exhaustion()),
            other => panic!("expected vision error, got {other:?}"),
        }
        assert_eq!(provider.calls().len(), 3);
    }
}
