//! Error types for anvil-auth
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! The OAuth callback never renders these; it collapses them into
//! an error redirect instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed credentials (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad signature, unsupported algorithm or expired token (401)
    #[error("Invalid token")]
    InvalidToken,

    /// GitHub rejected the authorization code (502)
    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session token could not be signed (500)
    #[error("Token signing error: {0}")]
    TokenSigning(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Metric label for this error
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::OAuthExchange(_) => "oauth_exchange",
            AppError::HttpClient(_) => "http_client",
            AppError::Config(_) => "config",
            AppError::TokenSigning(_) => "token_signing",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. Upstream and internal details stay in the logs.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::Unauthorized | AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::OAuthExchange(_) | AppError::HttpClient(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream error".to_string())
            }
            AppError::Config(_) | AppError::TokenSigning(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.error_type()])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
