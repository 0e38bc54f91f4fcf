//! Axum route handler and pipeline for roadmap generation.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::llm_client::prompts::with_json_instruction;
use crate::llm_client::{Gateway, GenerationSettings, LogicalRequest, Prompt, ShapeContract};
use crate::roadmap::prompts::ROADMAP_PROMPT_TEMPLATE;
use crate::roadmap::validation::validate_skill;
use crate::state::AppState;

const DEFAULT_LEVEL: &str = "Beginner";
const MAX_LEVEL_LEN: usize = 40;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapRequest {
    #[serde(default)]
    pub skill: String,
    pub current_level: Option<String>,
}

/// One week of a learning plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapWeek {
    pub week: u32,
    pub theme: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    pub project: String,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoadmapResponse {
    pub success: bool,
    pub data: Vec<RoadmapWeek>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Empty means "not a real skill"; otherwise a 3-6 week plan.
pub fn roadmap_contract() -> ShapeContract {
    ShapeContract::array_len(vec![0..=0, 3..=6])
}

/// Validates the skill, then asks the gateway for a plan.
/// An empty plan is the model's way of rejecting the topic.
pub async fn generate_roadmap(
    gateway: &Gateway,
    skill: &str,
    level: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Vec<RoadmapWeek>, AppError> {
    let skill =
        validate_skill(skill).map_err(|r| AppError::InvalidSkillFormat(r.message().to_string()))?;
    let level = normalize_level(level);

    info!("Generating roadmap for: {skill} ({level})");

    let prompt = ROADMAP_PROMPT_TEMPLATE
        .replace("{skill}", skill)
        .replace("{level}", &level);
    let request = LogicalRequest::new(
        Prompt::text(with_json_instruction(&prompt)).with_settings(GenerationSettings {
            temperature: 0.7,
            max_output_tokens: 2000,
        }),
        roadmap_contract(),
    );

    let roadmap: Vec<RoadmapWeek> = gateway.execute_as(request, cancel).await?;

    if roadmap.is_empty() {
        info!("Model rejected skill as not learnable: {skill}");
        return Err(AppError::InvalidSkill);
    }

    info!("Roadmap generated: {} weeks for {skill}", roadmap.len());
    Ok(roadmap)
}

fn normalize_level(level: Option<&str>) -> String {
    let level = level.map(str::trim).filter(|l| !l.is_empty());
    match level {
        Some(l) => l.chars().take(MAX_LEVEL_LEN).collect(),
        None => DEFAULT_LEVEL.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/roadmap
///
/// Generates a 3-6 week project-based learning plan for a skill.
pub async fn handle_generate_roadmap(
    State(state): State<AppState>,
    AppJson(request): AppJson<RoadmapRequest>,
) -> Result<Json<RoadmapResponse>, AppError> {
    let cancel = state.shutdown.child_token();
    let data = generate_roadmap(
        &state.gateway,
        &request.skill,
        request.current_level.as_deref(),
        &cancel,
    )
    .await?;

    Ok(Json(RoadmapResponse {
        success: true,
        data,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
