//! Minimal GitHub REST client: public profile and repositories.

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;

const USER_AGENT: &str = concat!("skillforge-api/", env!("CARGO_PKG_VERSION"));
const REPOS_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubUser {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub public_repos: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub fork: bool,
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub async fn fetch_user(&self, username: &str) -> Result<GithubUser, AppError> {
        self.get_json(&format!("/users/{username}"), username).await
    }

    pub async fn fetch_repos(&self, username: &str) -> Result<Vec<GithubRepo>, AppError> {
        self.get_json(
            &format!("/users/{username}/repos?per_page={REPOS_PER_PAGE}&sort=pushed"),
            username,
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, username: &str) -> Result<T, AppError> {
        let url = format!("{}{path}", self.base_url);
        debug!("GitHub GET {url}");

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub request failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!(
                "GitHub user '{username}' not found"
            ))),
            status if !status.is_success() => Err(AppError::Upstream(format!(
                "GitHub returned {status} for {path}"
            ))),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| AppError::Upstream(format!("GitHub response malformed: {e}"))),
        }
    }
}

/// GitHub usernames: 1-39 chars, alphanumeric or single hyphens, no leading/trailing hyphen.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 39
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !username.starts_with('-')
        && !username.ends_with('-')
        && !username.contains("--")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(is_valid_username("torvalds"));
        assert!(is_valid_username("some-user-42"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("-leading"));
        assert!(!is_valid_username("trailing-"));
        assert!(!is_valid_username("double--hyphen"));
        assert!(!is_valid_username("../etc/passwd"));
        assert!(!is_valid_username(&"a".repeat(40)));
    }

    #[tokio::test]
    async fn test_fetch_user_and_repos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octocat",
                "name": "The Octocat",
                "bio": null,
                "followers": 42,
                "public_repos": 2,
                "created_at": "2011-01-25T18:44:36Z"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "hello-world", "description": "My first repo", "language": "Rust",
                 "stargazers_count": 10, "forks_count": 1, "fork": false,
                 "pushed_at": "2024-05-01T00:00:00Z"},
                {"name": "dotfiles", "description": null, "language": null,
                 "stargazers_count": 0, "forks_count": 0, "fork": true, "pushed_at": null}
            ])))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), Some("gh-token".to_string())).unwrap();
        let user = client.fetch_user("octocat").await.unwrap();
        let repos = client.fetch_repos("octocat").await.unwrap();

        assert_eq!(user.followers, 42);
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));
        assert!(repos[1].fork);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None).unwrap();
        let err = client.fetch_user("ghost-user").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_github_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None).unwrap();
        let err = client.fetch_repos("octocat").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
