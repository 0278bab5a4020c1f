//! anvil-auth - GitHub OAuth login for the Anvil web app
//!
//! # Architecture
//!
//! ```text
//! browser ──► GET /auth/github ──► GitHub authorize
//!                                       │
//! browser ◄── <webapp>/auth/callback#token=… ◄── GET /auth/github/callback
//!                                       │
//!                       token exchange, /user, /user/emails (GitHub)
//!                       signup notification (detached)
//! ```
//!
//! The service is stateless: a session is a signed token held by the client.
//!
//! # Modules
//!
//! - `api`: identity and metrics endpoints
//! - `auth`: GitHub OAuth flow, email resolution, session tokens
//! - `notification`: best-effort signup notifications
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notification;

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

/// Application state shared across all handlers
///
/// Built once at start-up. Cloned per request; everything inside is immutable.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// GitHub OAuth and REST client
    pub github: Arc<auth::GitHubClient>,

    /// Signup notification sender
    pub notifier: Arc<notification::SignupNotifier>,

    /// Key signing the OAuth state cookie
    cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or a client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        config.validate()?;

        let timeout = std::time::Duration::from_secs(config.auth.github.request_timeout_seconds);

        let http_client = reqwest::Client::builder()
            .user_agent(config.auth.github.user_agent.as_str())
            .timeout(timeout)
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let github = auth::GitHubClient::new(http_client, &config.auth.github);

        let notifier = notification::SignupNotifier::new(&config.notification, timeout)?;

        let cookie_key = Key::derive_from(config.auth.session_secret.as_bytes());

        tracing::info!(
            notifications = notifier.is_enabled(),
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            github: Arc::new(github),
            notifier: Arc::new(notifier),
            cookie_key,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    let cors_layer = build_cors_layer(&state.config.webapp);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::me_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

/// Only the web client may call with credentials.
fn build_cors_layer(webapp: &config::WebappConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let origin = url::Url::parse(&webapp.url)
        .ok()
        .map(|url| url.origin().ascii_serialization());

    match origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin([origin])
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        _ => {
            tracing::error!(
                url = %webapp.url,
                "Failed to parse CORS origin from webapp URL; denying cross-origin requests"
            );
            CorsLayer::new()
        }
    }
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "ok": true }))
}
