//! GitHub API client
//!
//! The three upstream calls of the login flow. Each is attempted once.

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};

use super::email::EmailCandidate;
use crate::config::GitHubOAuthConfig;
use crate::error::{AppError, Result};

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Token exchange request body
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// GitHub token response
///
/// GitHub answers 200 with an `error` field when the code is rejected.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GitHub user info
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    /// Public profile email
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
}

impl GitHubUser {
    /// Profile name, or the login when the name is unset or blank
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.login)
    }
}

/// Client for GitHub's OAuth and REST endpoints
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
    user_agent: String,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, config: &GitHubOAuthConfig) -> Self {
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    /// `AppError::OAuthExchange` when GitHub reports an error or omits the token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let response: TokenResponse = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            let detail = response.error_description.unwrap_or_default();
            return Err(AppError::OAuthExchange(format!("{error}: {detail}")));
        }

        response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::OAuthExchange("no access token".to_string()))
    }

    /// GET /user
    pub async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser> {
        self.get_json("/user", access_token).await
    }

    /// GET /user/emails
    pub async fn fetch_emails(&self, access_token: &str) -> Result<Vec<EmailCandidate>> {
        self.get_json("/user/emails", access_token).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T> {
        let value = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(access_token)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }
}
