//! Axum route handler and pipeline for the GitHub profile audit.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::llm_client::prompts::with_json_instruction;
use crate::llm_client::{Gateway, LogicalRequest, Prompt, ShapeContract};
use crate::profile::github::{is_valid_username, GithubRepo, GithubUser};
use crate::profile::prompts::AUDIT_PROMPT_TEMPLATE;
use crate::profile::stats::{compute_stats, infer_job_roles, GithubStats, LanguageShare};
use crate::state::AppState;

/// Repos included in the prompt, best-starred first.
const MAX_PROMPT_REPOS: usize = 30;
const MAX_DESCRIPTION_CHARS: usize = 160;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileScanRequest {
    #[serde(default)]
    pub github_username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateTier {
    S,
    A,
    B,
    C,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechStack {
    #[serde(default)]
    pub frontend: Vec<String>,
    #[serde(default)]
    pub backend: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestProject {
    pub name: String,
    pub insight: String,
}

/// Engineering audit of a GitHub profile, as produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAudit {
    pub candidate_tier: CandidateTier,
    pub score: u8,
    pub professional_summary: String,
    #[serde(default)]
    pub tech_stack: TechStack,
    #[serde(default)]
    pub soft_skills_detected: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    pub best_project_analysis: BestProject,
    #[serde(default)]
    pub recommended_roles: Vec<String>,
    #[serde(default)]
    pub roast: String,
}

/// Audit result. `degraded` marks the canned fallback used when the AI failed.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    #[serde(flatten)]
    pub audit: ProfileAudit,
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileScan {
    pub username: String,
    pub stats: GithubStats,
    pub suggested_roles: Vec<String>,
    pub audit: AuditOutcome,
}

#[derive(Debug, Serialize)]
pub struct ProfileScanResponse {
    pub success: bool,
    pub data: ProfileScan,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Required keys and the score range. The typed decode runs after this.
pub fn audit_contract() -> ShapeContract {
    ShapeContract::object_with_keys(&[
        "candidate_tier",
        "score",
        "professional_summary",
        "best_project_analysis",
    ])
    .and(ShapeContract::integer_field("score", 0..=100))
}

/// Asks the gateway for an audit. Never fails: any gateway error yields the
/// fallback audit with `degraded: true`.
pub async fn audit_profile(
    gateway: &Gateway,
    user: &GithubUser,
    repos: &[GithubRepo],
    languages: &[LanguageShare],
    cancel: &CancellationToken,
) -> AuditOutcome {
    let prompt = build_audit_prompt(user, repos, languages);
    let request = LogicalRequest::new(Prompt::text(with_json_instruction(&prompt)), audit_contract());

    match gateway.execute_as::<ProfileAudit>(request, cancel).await {
        Ok(audit) => AuditOutcome {
            audit,
            degraded: false,
        },
        Err(e) => {
            warn!("Audit for {} fell back to canned data: {e}", user.login);
            AuditOutcome {
                audit: fallback_audit(languages, "AI service unavailable"),
                degraded: true,
            }
        }
    }
}

fn build_audit_prompt(user: &GithubUser, repos: &[GithubRepo], languages: &[LanguageShare]) -> String {
    let name = user
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&user.login);
    let bio = user.bio.as_deref().filter(|b| !b.trim().is_empty()).unwrap_or("None");
    let languages = if languages.is_empty() {
        "None".to_string()
    } else {
        languages
            .iter()
            .map(|l| l.language.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    AUDIT_PROMPT_TEMPLATE
        .replace("{repos}", &repo_summaries(repos).to_string())
        .replace("{languages}", &languages)
        .replace("{bio}", bio)
        .replace("{name}", name)
}

/// Compact JSON summary of the candidate's own (non-fork) repos.
fn repo_summaries(repos: &[GithubRepo]) -> Value {
    let mut own: Vec<&GithubRepo> = repos.iter().filter(|r| !r.fork).collect();
    own.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));

    Value::Array(
        own.into_iter()
            .take(MAX_PROMPT_REPOS)
            .map(|r| {
                json!({
                    "name": r.name,
                    "description": r.description.as_deref().map(|d| {
                        d.chars().take(MAX_DESCRIPTION_CHARS).collect::<String>()
                    }),
                    "language": r.language,
                    "stars": r.stargazers_count,
                    "forks": r.forks_count,
                })
            })
            .collect(),
    )
}

pub fn fallback_audit(languages: &[LanguageShare], reason: &str) -> ProfileAudit {
    ProfileAudit {
        candidate_tier: CandidateTier::B,
        score: 70,
        professional_summary: format!("Audit incomplete ({reason})."),
        tech_stack: TechStack {
            frontend: languages.iter().take(3).map(|l| l.language.clone()).collect(),
            backend: Vec::new(),
        },
        soft_skills_detected: vec!["Persistence".to_string()],
        strengths: vec!["Code Availability".to_string()],
        weaknesses: vec!["Cannot analyze code depth".to_string()],
        best_project_analysis: BestProject {
            name: "Unknown".to_string(),
            insight: "Data unavailable".to_string(),
        },
        recommended_roles: vec!["Developer".to_string()],
        roast: "I'm offline, so you get a free pass.".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/github
///
/// Fetches a public GitHub profile, computes language stats and role hints,
/// and attaches an AI engineering audit.
pub async fn handle_scan_profile(
    State(state): State<AppState>,
    AppJson(request): AppJson<ProfileScanRequest>,
) -> Result<Json<ProfileScanResponse>, AppError> {
    let username = request.github_username.trim();
    if !is_valid_username(username) {
        return Err(AppError::Validation(
            "githubUsername must be a valid GitHub username".to_string(),
        ));
    }

    info!("Scanning GitHub profile: {username}");

    let (user, repos) = tokio::try_join!(
        state.github.fetch_user(username),
        state.github.fetch_repos(username)
    )?;

    let stats = compute_stats(&user, &repos, Utc::now());
    let suggested_roles = infer_job_roles(&stats.top_languages);

    let cancel = state.shutdown.child_token();
    let audit = audit_profile(&state.gateway, &user, &repos, &stats.top_languages, &cancel).await;

    info!(
        "Profile scan complete for {username}: {} repos, degraded={}",
        repos.len(),
        audit.degraded
    );

    Ok(Json(ProfileScanResponse {
        success: true,
        data: ProfileScan {
            username: user.login,
            stats,
            suggested_roles,
            audit,
        },
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::llm_client::executor::RetryPolicy;
    use crate::llm_client::pool::CredentialPool;
    use crate::llm_client::provider::testing::{server_error, ScriptedProvider};

    const AUDIT: &str = r#"Here is the audit:
{
  "candidate_tier": "A",
  "score": 84,
  "professional_summary": "Pragmatic systems programmer.",
  "tech_stack": {"frontend": [], "backend": ["Rust", "PostgreSQL"]},
  "soft_skills_detected": ["Ownership", "Documentation", "Focus"],
  "strengths": ["Clean module boundaries"],
  "weaknesses": ["Sparse tests"],
  "best_project_analysis": {"name": "kv-store", "insight": "Solid concurrency design"},
  "recommended_roles": ["Backend Engineer"],
  "roast": "Your README is longer than your code."
}"#;

    fn user() -> GithubUser {
        GithubUser {
            login: "octocat".into(),
            name: Some("The Octocat".into()),
            bio: Some("Builds databases".into()),
            followers: 10,
            public_repos: 2,
            created_at: Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn repos() -> Vec<GithubRepo> {
        vec![
            GithubRepo {
                name: "kv-store".into(),
                description: Some("An embedded key-value store".into()),
                language: Some("Rust".into()),
                stargazers_count: 120,
                forks_count: 4,
                fork: false,
                pushed_at: None,
            },
            GithubRepo {
                name: "forked-lib".into(),
                description: None,
                language: Some("C".into()),
                stargazers_count: 9000,
                forks_count: 0,
                fork: true,
                pushed_at: None,
            },
        ]
    }

    fn languages() -> Vec<LanguageShare> {
        vec![
            LanguageShare { language: "Rust".into(), percentage: 50 },
            LanguageShare { language: "C".into(), percentage: 50 },
        ]
    }

    fn gateway_with(provider: ScriptedProvider) -> (Gateway, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let gateway = Gateway::new(
            provider.clone(),
            CredentialPool::new(["K1", "K2"]).unwrap(),
            RetryPolicy::default(),
        );
        (gateway, provider)
    }

    #[tokio::test(start_paused = true)]
    async fn test_audit_from_model() {
        let (gateway, _) = gateway_with(ScriptedProvider::always(AUDIT));

        let outcome =
            audit_profile(&gateway, &user(), &repos(), &languages(), &CancellationToken::new()).await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.audit.candidate_tier, CandidateTier::A);
        assert_eq!(outcome.audit.score, 84);
        assert_eq!(outcome.audit.best_project_analysis.name, "kv-store");
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_failure_yields_degraded_fallback() {
        let (gateway, provider) = gateway_with(ScriptedProvider::new(|_, _| Err(server_error())));

        let outcome =
            audit_profile(&gateway, &user(), &repos(), &languages(), &CancellationToken::new()).await;

        assert!(outcome.degraded);
        assert_eq!(outcome.audit, fallback_audit(&languages(), "AI service unavailable"));
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_score_is_retried() {
        let bad = AUDIT.replace("\"score\": 84", "\"score\": 140");
        let (gateway, provider) = gateway_with(ScriptedProvider::new(move |key, _| {
            if key == "K1" {
                Ok(bad.clone())
            } else {
                Ok(AUDIT.to_string())
            }
        }));

        let outcome =
            audit_profile(&gateway, &user(), &repos(), &languages(), &CancellationToken::new()).await;

        assert!(!outcome.degraded);
        assert_eq!(provider.calls(), vec!["K1", "K2"]);
    }

    #[test]
    fn test_prompt_carries_profile_context_without_forks() {
        let prompt = build_audit_prompt(&user(), &repos(), &languages());

        assert!(prompt.contains("Name: The Octocat"));
        assert!(prompt.contains("Bio: Builds databases"));
        assert!(prompt.contains("Top Languages: Rust, C"));
        assert!(prompt.contains("kv-store"));
        assert!(!prompt.contains("forked-lib"));
    }

    #[test]
    fn test_prompt_falls_back_to_login_without_display_name() {
        let mut anonymous = user();
        anonymous.name = None;

        let prompt = build_audit_prompt(&anonymous, &repos(), &languages());

        assert!(prompt.contains("Name: octocat"));
    }

    #[test]
    fn test_fallback_audit_serializes_with_degraded_flag() {
        let outcome = AuditOutcome {
            audit: fallback_audit(&languages(), "test"),
            degraded: true,
        };
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["degraded"], true);
        assert_eq!(value["candidate_tier"], "B");
        assert_eq!(value["tech_stack"]["frontend"], json!(["Rust", "C"]));
    }

    #[test]
    fn test_contract_rejects_out_of_range_score() {
        let contract = audit_contract();
        let audit = |score: Value| {
            json!({
                "candidate_tier": "C",
                "score": score,
                "professional_summary": "s",
                "best_project_analysis": {"name": "n", "insight": "i"}
            })
        };
        assert!(contract.check(&audit(json!(100))).is_ok());
        assert!(contract.check(&audit(json!(101))).is_err());
        assert!(contract.check(&audit(json!("high"))).is_err());
        assert!(contract.check(&json!({"score": 50})).is_err());
    }
}
