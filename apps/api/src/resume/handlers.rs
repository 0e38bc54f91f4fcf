//! Axum route handler and pipeline for the resume ATS scan.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::with_json_instruction;
use crate::llm_client::{Gateway, GenerationSettings, LogicalRequest, Prompt, ShapeContract};
use crate::resume::document::{detect_kind, extract_text, DocumentKind};
use crate::resume::prompts::ATS_PROMPT_TEMPLATE;
use crate::state::AppState;

pub const RESUME_FIELD: &str = "resume";
pub const JOB_DESCRIPTION_FIELD: &str = "jobDescription";

const MAX_JOB_DESCRIPTION_CHARS: usize = 8_000;

const ATS_SETTINGS: GenerationSettings = GenerationSettings {
    temperature: 0.4,
    max_output_tokens: 1500,
};

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsReport {
    pub match_score: u8,
    pub hard_skills_missing: Vec<String>,
    #[serde(default)]
    pub soft_skills_missing: Vec<String>,
    #[serde(default)]
    pub keywords_found: Vec<String>,
    pub correction: String,
}

#[derive(Debug, Serialize)]
pub struct AtsResponse {
    pub success: bool,
    pub data: AtsReport,
}

/// A resume file and the job it is scanned against, as read off the form.
#[derive(Debug)]
pub struct AtsUpload {
    pub kind: DocumentKind,
    pub data: Bytes,
    pub job_description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub fn ats_contract() -> ShapeContract {
    ShapeContract::object_with_keys(&["match_score", "hard_skills_missing", "correction"])
        .and(ShapeContract::integer_field("match_score", 0..=100))
}

pub async fn scan_resume(
    gateway: &Gateway,
    resume: &str,
    job_description: &str,
    cancel: &CancellationToken,
) -> Result<AtsReport, AppError> {
    info!(
        "Scanning resume ({} chars) against job description ({} chars)",
        resume.chars().count(),
        job_description.chars().count()
    );

    let prompt = build_ats_prompt(resume, job_description);
    let request = LogicalRequest::new(
        Prompt::text(with_json_instruction(&prompt)).with_settings(ATS_SETTINGS),
        ats_contract(),
    );

    let report: AtsReport = gateway.execute_as(request, cancel).await?;

    info!(
        "ATS scan done: score {}, {} hard skills missing",
        report.match_score,
        report.hard_skills_missing.len()
    );
    Ok(report)
}

fn build_ats_prompt(resume: &str, job_description: &str) -> String {
    ATS_PROMPT_TEMPLATE
        .replace("{job_description}", job_description)
        .replace("{resume}", resume)
}

/// Reads the `resume` file and `jobDescription` text fields, in any order.
pub async fn read_upload(multipart: &mut Multipart) -> Result<AtsUpload, AppError> {
    let mut file: Option<(DocumentKind, Bytes)> = None;
    let mut job_description = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(RESUME_FIELD) => {
                let kind = detect_kind(field.file_name(), field.content_type())?;
                let data = field.bytes().await?;
                if data.is_empty() {
                    return Err(AppError::NoFile("Uploaded resume is empty.".to_string()));
                }
                file = Some((kind, data));
            }
            Some(JOB_DESCRIPTION_FIELD) => job_description = field.text().await?,
            _ => continue,
        }
    }

    let Some((kind, data)) = file else {
        return Err(AppError::NoFile("Resume file is required.".to_string()));
    };
    let job_description = job_description.trim();
    if job_description.is_empty() {
        return Err(AppError::Validation("Job description is required.".to_string()));
    }

    Ok(AtsUpload {
        kind,
        data,
        job_description: job_description.chars().take(MAX_JOB_DESCRIPTION_CHARS).collect(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/ats
///
/// Multipart upload with a `resume` file (PDF or DOCX) and a `jobDescription` field.
pub async fn handle_scan_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AtsResponse>, AppError> {
    let upload = read_upload(&mut multipart).await?;
    let resume = extract_text(upload.kind, upload.data).await?;
    let cancel = state.shutdown.child_token();
    let data = scan_resume(&state.gateway, &resume, &upload.job_description, &cancel).await?;

    Ok(Json(AtsResponse {
        success: true,
        data,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
