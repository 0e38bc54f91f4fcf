use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::executor::{
    RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_ATTEMPTS,
};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Application configuration loaded from environment variables.
/// Startup fails if no AI credential is configured.
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed from the comma-delimited `GEMINI_API_KEY`. Never logged.
    pub gemini_api_keys: Vec<String>,
    pub gemini_api_base: String,
    pub github_api_base: String,
    pub github_token: Option<String>,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub call_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let raw_keys = require_env("GEMINI_API_KEY")?;
        let gemini_api_keys = parse_credential_list(&raw_keys);
        if gemini_api_keys.is_empty() {
            bail!("GEMINI_API_KEY is set but contains no usable credentials");
        }

        let max_attempts = parse_or("AI_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            bail!("AI_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            gemini_api_keys,
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            github_api_base: optional_env("GITHUB_API_BASE")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
            github_token: optional_env("GITHUB_TOKEN"),
            max_attempts,
            backoff_base: Duration::from_millis(parse_or(
                "AI_BACKOFF_BASE_MS",
                DEFAULT_BACKOFF_BASE.as_millis() as u64,
            )?),
            call_timeout: Duration::from_secs(parse_or(
                "AI_CALL_TIMEOUT_SECS",
                DEFAULT_CALL_TIMEOUT.as_secs(),
            )?),
            port: parse_or("PORT", 5000u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_base: self.backoff_base,
            call_timeout: self.call_timeout,
        }
    }
}

/// Splits a delimited credential list. Entries are trimmed, blanks dropped,
/// and duplicates removed keeping the first occurrence.
pub fn parse_credential_list(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
