//! Pure profile statistics derived from GitHub data. No I/O.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::profile::github::{GithubRepo, GithubUser};

const DEFAULT_ROLE: &str = "Software Engineer Intern";
const ACTIVE_WINDOW_DAYS: i64 = 180;

/// Language → role hints. A role is suggested when any of its languages appears.
const ROLE_HINTS: &[(&[&str], &str)] = &[
    (&["javascript", "typescript", "vue", "svelte"], "Frontend Developer"),
    (&["go", "java", "kotlin", "c#", "php", "ruby", "elixir"], "Backend Developer"),
    (&["python"], "Python Developer"),
    (&["jupyter notebook", "r"], "Data Analyst"),
    (&["swift", "dart", "objective-c"], "Mobile Developer"),
    (&["rust", "c", "c++", "zig"], "Systems Engineer"),
    (&["hcl", "dockerfile", "nix"], "DevOps Engineer"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubStats {
    pub followers: u32,
    pub repos: u32,
    pub top_languages: Vec<LanguageShare>,
    pub account_age_years: i64,
    pub recently_active_repos: usize,
}

/// Share of repositories per primary language, as a rounded percentage of
/// all repositories (repos without a language count toward the total).
/// Sorted by percentage descending, then name.
pub fn language_shares(repos: &[GithubRepo]) -> Vec<LanguageShare> {
    if repos.is_empty() {
        return Vec::new();
    }

    let mut counts: HashMap<&str, u32> = HashMap::new();
    for language in repos.iter().filter_map(|r| r.language.as_deref()) {
        *counts.entry(language).or_default() += 1;
    }

    let total = repos.len() as f64;
    let mut shares: Vec<LanguageShare> = counts
        .into_iter()
        .map(|(language, count)| LanguageShare {
            language: language.to_string(),
            percentage: (f64::from(count) / total * 100.0).round() as u32,
        })
        .collect();
    shares.sort_by(|a, b| {
        b.percentage
            .cmp(&a.percentage)
            .then_with(|| a.language.cmp(&b.language))
    });
    shares
}

pub fn infer_job_roles(languages: &[LanguageShare]) -> Vec<String> {
    let present: Vec<String> = languages
        .iter()
        .map(|l| l.language.to_lowercase())
        .collect();

    let mut roles: Vec<String> = ROLE_HINTS
        .iter()
        .filter(|(hints, _)| hints.iter().any(|h| present.iter().any(|p| p == h)))
        .map(|(_, role)| role.to_string())
        .collect();

    if roles.is_empty() {
        roles.push(DEFAULT_ROLE.to_string());
    }
    roles
}

pub fn compute_stats(user: &GithubUser, repos: &[GithubRepo], now: DateTime<Utc>) -> GithubStats {
    let active_since = now - Duration::days(ACTIVE_WINDOW_DAYS);
    GithubStats {
        followers: user.followers,
        repos: user.public_repos,
        top_languages: language_shares(repos),
        account_age_years: (now - user.created_at).num_days().max(0) / 365,
        recently_active_repos: repos
            .iter()
            .filter(|r| r.pushed_at.is_some_and(|p| p >= active_since))
            .count(),
    }
}
