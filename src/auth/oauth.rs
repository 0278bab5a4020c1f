//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub and hands
//! the browser a signed session token in the URL fragment.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use axum_extra::extract::SignedCookieJar;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::RngCore;
use serde::Deserialize;
use url::Url;

use super::cookies;
use super::email::resolve_email;
use super::session::{SessionClaims, create_session_token};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::metrics::{EMAIL_RESOLUTIONS_TOTAL, LOGINS_TOTAL};
use crate::notification::SignupEvent;

/// Scopes requested from GitHub
const SCOPES: &str = "read:user user:email";

/// Create authentication router
///
/// Routes:
/// - GET /auth/github - Redirect to GitHub
/// - GET /auth/github/callback - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/github", get(github_redirect))
        .route("/auth/github/callback", get(github_callback))
}

/// Reasons reported to the web client's error page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    /// GitHub did not return an authorization code
    NoCode,
    /// Anything else
    OAuthFailed,
}

impl LoginFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            LoginFailure::NoCode => "no_code",
            LoginFailure::OAuthFailed => "oauth_failed",
        }
    }
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github
///
/// Redirects user to GitHub authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in a signed cookie
/// 3. Redirect to GitHub with client_id, redirect_uri, scope, state
async fn github_redirect(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    let csrf_state = generate_csrf_state();
    let location = authorize_url(&state.config, &csrf_state)?;

    let jar = jar.add(cookies::state_cookie(
        &csrf_state,
        state.config.server.oauth_cookie_path(),
        state.config.should_use_secure_cookies(),
        state.config.auth.state_max_age,
    ));

    Ok((jar, Redirect::to(location.as_str())))
}

/// Query parameters from GitHub callback
#[derive(Debug, Default, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
}

/// GET /auth/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Require a code
/// 2. Verify CSRF state
/// 3. Exchange code, fetch profile and emails, issue token (see `complete_login`)
/// 4. Redirect to the web client, token in the fragment
///
/// Always answers with a redirect. Error details stay in the logs.
async fn github_callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    query: Option<Query<GitHubCallbackQuery>>,
) -> (SignedCookieJar, Redirect) {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let expected_state = cookies::get_state(&jar);
    let jar = jar.remove(cookies::clear_state_cookie(
        state.config.server.oauth_cookie_path(),
    ));
    let webapp = state.config.webapp.base_url();

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        LOGINS_TOTAL.with_label_values(&["no_code"]).inc();
        tracing::info!("OAuth callback without authorization code");
        return (jar, error_redirect(webapp, LoginFailure::NoCode));
    };

    if !state_matches(expected_state.as_deref(), query.state.as_deref()) {
        LOGINS_TOTAL.with_label_values(&["state_mismatch"]).inc();
        tracing::warn!(
            has_cookie = expected_state.is_some(),
            "OAuth state missing or mismatched"
        );
        return (jar, error_redirect(webapp, LoginFailure::OAuthFailed));
    }

    match complete_login(&state, &code).await {
        Ok(token) => {
            LOGINS_TOTAL.with_label_values(&["success"]).inc();
            (jar, Redirect::to(&format!("{webapp}/auth/callback#token={token}")))
        }
        Err(error) => {
            LOGINS_TOTAL.with_label_values(&["oauth_failed"]).inc();
            crate::metrics::ERRORS_TOTAL
                .with_label_values(&[error.error_type()])
                .inc();
            tracing::error!(%error, "GitHub OAuth error");
            (jar, error_redirect(webapp, LoginFailure::OAuthFailed))
        }
    }
}

/// Exchange the code and issue a session token.
///
/// Email lookup is the only step allowed to fail without failing the login.
async fn complete_login(state: &AppState, code: &str) -> Result<String, AppError> {
    let access_token = state.github.exchange_code(code).await?;
    let user = state.github.fetch_user(&access_token).await?;

    let candidates = match state.github.fetch_emails(&access_token).await {
        Ok(candidates) => candidates,
        Err(error) => {
            tracing::warn!(
                login = %user.login,
                %error,
                "Failed to fetch emails; using profile email"
            );
            Vec::new()
        }
    };
    let resolved = resolve_email(&candidates, user.email.as_deref());
    EMAIL_RESOLUTIONS_TOTAL
        .with_label_values(&[resolved.source.as_str()])
        .inc();

    tracing::info!(
        login = %user.login,
        github_id = user.id,
        email = ?resolved.address,
        email_source = resolved.source.as_str(),
        candidates = candidates.len(),
        "New signup"
    );

    state.notifier.notify(SignupEvent::new(
        user.display_name(),
        resolved.address.as_deref(),
        &user.login,
        state.notifier.source(),
        Utc::now(),
    ));

    let claims = SessionClaims::new(
        &user,
        resolved.address,
        access_token,
        state.config.auth.session_max_age,
    )?;
    create_session_token(&claims, &state.config.auth.session_secret)
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn state_matches(expected: Option<&str>, received: Option<&str>) -> bool {
    matches!((expected, received), (Some(expected), Some(received)) if expected == received)
}

/// Build GitHub's authorize URL
fn authorize_url(config: &AppConfig, csrf_state: &str) -> Result<Url, AppError> {
    let github = &config.auth.github;
    Url::parse_with_params(
        &github.authorize_url,
        &[
            ("client_id", github.client_id.as_str()),
            ("redirect_uri", config.server.callback_url().as_str()),
            ("scope", SCOPES),
            ("state", csrf_state),
        ],
    )
    .map_err(|e| AppError::Config(format!("auth.github.authorize_url: {e}")))
}

fn error_redirect(webapp: &str, failure: LoginFailure) -> Redirect {
    Redirect::to(&format!("{webapp}/auth/error?reason={}", failure.reason()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AuthConfig, GitHubOAuthConfig, LoggingConfig, NotificationConfig, ServerConfig,
        WebappConfig,
    };

    fn config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                public_url: "https://auth.example.com/".to_string(),
            },
            webapp: WebappConfig {
                url: "https://anvil.example.com".to_string(),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 2_592_000,
                state_max_age: 600,
                github: GitHubOAuthConfig {
                    client_id: "client-123".to_string(),
                    client_secret: "secret".to_string(),
                    authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                    token_url: "https://github.com/login/oauth/access_token".to_string(),
                    api_url: "https://api.github.com".to_string(),
                    user_agent: "Anvil".to_string(),
                    request_timeout_seconds: 30,
                },
            },
            notification: NotificationConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn authorize_url_carries_client_callback_scopes_and_state() {
        let url = authorize_url(&config(), "nonce").unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with("https://github.com/login/oauth/authorize?"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(
            params["redirect_uri"],
            "https://auth.example.com/auth/github/callback"
        );
        assert_eq!(params["scope"], "read:user user:email");
        assert_eq!(params["state"], "nonce");
    }

    #[test]
    fn csrf_states_are_random_and_url_safe() {
        let first = generate_csrf_state();
        let second = generate_csrf_state();

        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn state_must_be_present_on_both_sides_and_equal() {
        assert!(state_matches(Some("a"), Some("a")));
        assert!(!state_matches(Some("a"), Some("b")));
        assert!(!state_matches(None, Some("a")));
        assert!(!state_matches(Some("a"), None));
        assert!(!state_matches(None, None));
    }

    #[test]
    fn failure_reasons_match_web_client_routes() {
        assert_eq!(LoginFailure::NoCode.reason(), "no_code");
        assert_eq!(LoginFailure::OAuthFailed.reason(), "oauth_failed");
    }
}
