//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webapp: WebappConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3001)
    pub port: u16,
    /// Public URL of this service, used to build the OAuth callback URI
    /// (e.g., "https://auth.example.com")
    pub public_url: String,
}

impl ServerConfig {
    /// Get the base URL for the service, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    /// Redirect URI registered with GitHub
    pub fn callback_url(&self) -> String {
        format!("{}/auth/github/callback", self.base_url())
    }

    /// Path the service is published under, empty at the root
    ///
    /// A reverse proxy may strip this prefix before requests reach the router,
    /// but the browser still sees it.
    pub fn path_prefix(&self) -> String {
        Url::parse(self.base_url())
            .map(|url| url.path().trim_end_matches('/').to_string())
            .unwrap_or_default()
    }

    /// Cookie path covering both OAuth routes as the browser addresses them
    pub fn oauth_cookie_path(&self) -> String {
        format!("{}/auth/github", self.path_prefix())
    }
}

/// Web client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebappConfig {
    /// Base URL of the browser app (e.g., "https://anvil.example.com")
    pub url: String,
}

impl WebappConfig {
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret (32+ bytes)
    pub session_secret: String,
    /// Session token lifetime in seconds (default: 2592000 = 30 days)
    pub session_max_age: i64,
    /// OAuth state cookie lifetime in seconds (default: 600)
    pub state_max_age: i64,
    pub github: GitHubOAuthConfig,
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    /// REST API base (e.g., "https://api.github.com")
    pub api_url: String,
    /// Sent as `User-Agent` on every GitHub API call
    pub user_agent: String,
    pub request_timeout_seconds: u64,
}

/// Signup notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Endpoint receiving signup events. Unset disables notifications.
    pub endpoint: Option<String>,
    /// Source tag attached to each event
    #[serde(default = "default_notification_source")]
    pub source: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            source: default_notification_source(),
        }
    }
}

fn default_notification_source() -> String {
    "github_oauth".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Default `EnvFilter` directive, overridden by `RUST_LOG`
    pub fn filter_directive(&self) -> String {
        let level = self.level.to_ascii_lowercase();
        format!("anvil_auth={level},tower_http={level}")
    }
}

/// Longest accepted session lifetime (10 years)
const MAX_SESSION_MAX_AGE: i64 = 10 * 365 * 24 * 60 * 60;

/// Longest accepted OAuth state lifetime (1 day)
const MAX_STATE_MAX_AGE: i64 = 24 * 60 * 60;

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (ANVIL__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> crate::error::Result<Self> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("server.public_url", "http://localhost:3001")?
            .set_default("webapp.url", "http://localhost:5173")?
            .set_default("auth.session_max_age", 2_592_000)?
            .set_default("auth.state_max_age", 600)?
            .set_default(
                "auth.github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "auth.github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("auth.github.api_url", "https://api.github.com")?
            .set_default("auth.github.user_agent", "Anvil")?
            .set_default("auth.github.request_timeout_seconds", 30)?
            .set_default("notification.source", "github_oauth")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("ANVIL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        Url::parse(&self.server.public_url)
            .map(|url| url.scheme() == "https" || !is_local_host(&url))
            .unwrap_or(true)
    }

    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AppError;

        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if !(1..=MAX_SESSION_MAX_AGE).contains(&self.auth.session_max_age) {
            return Err(AppError::Config(format!(
                "auth.session_max_age must be between 1 and {} seconds",
                MAX_SESSION_MAX_AGE
            )));
        }

        if !(1..=MAX_STATE_MAX_AGE).contains(&self.auth.state_max_age) {
            return Err(AppError::Config(format!(
                "auth.state_max_age must be between 1 and {} seconds",
                MAX_STATE_MAX_AGE
            )));
        }

        if self.auth.github.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "auth.github.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error; got {}",
                self.logging.level
            )));
        }

        if !self.logging.is_json() && !self.logging.format.eq_ignore_ascii_case("pretty") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {}",
                self.logging.format
            )));
        }

        if self.auth.github.client_id.trim().is_empty()
            || self.auth.github.client_secret.trim().is_empty()
        {
            return Err(AppError::Config(
                "auth.github.client_id and auth.github.client_secret are required".to_string(),
            ));
        }

        let public_url = parse_http_url("server.public_url", &self.server.public_url)?;
        parse_http_url("webapp.url", &self.webapp.url)?;
        parse_http_url("auth.github.authorize_url", &self.auth.github.authorize_url)?;
        parse_http_url("auth.github.token_url", &self.auth.github.token_url)?;
        parse_http_url("auth.github.api_url", &self.auth.github.api_url)?;
        if let Some(endpoint) = self
            .notification
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
        {
            parse_http_url("notification.endpoint", endpoint)?;
        }

        if is_local_host(&public_url) {
            if public_url.scheme() != "https" {
                tracing::warn!(
                    public_url = %self.server.public_url,
                    "Using insecure state cookies for local development"
                );
            }
        } else if public_url.scheme() != "https" {
            return Err(AppError::Config(
                "server.public_url must be https for non-local hosts".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_http_url(key: &str, value: &str) -> crate::error::Result<Url> {
    let url = Url::parse(value.trim()).map_err(|e| {
        crate::error::AppError::Config(format!("{key} is not a valid URL: {e}"))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(crate::error::AppError::Config(format!(
            "{key} must use http or https, got {scheme}"
        ))),
    }
}

fn is_local_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
