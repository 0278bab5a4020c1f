//! Session tokens
//!
//! HS256-signed JWTs handed to the browser after login.
//! No server-side session storage needed: validity is signature plus expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::github::GitHubUser;
use crate::error::{AppError, Result};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a session token
///
/// Field names are read by the web client, keep them stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// GitHub numeric user ID, never the login
    pub sub: String,
    /// GitHub username
    pub login: String,
    /// Display name, the login when the profile has none
    pub name: String,
    /// Resolved email address
    pub email: Option<String>,
    /// Avatar URL from GitHub
    pub avatar: String,
    /// GitHub access token.
    ///
    /// Anyone who can read the session token can call GitHub as the user,
    /// and the session cannot outlive a revoked GitHub grant.
    /// TODO: keep this server side keyed by `sub` once there is a store.
    pub github_token: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}

impl SessionClaims {
    /// Build claims for a freshly authenticated GitHub user
    ///
    /// # Errors
    /// `AppError::Config` when `lifetime_seconds` pushes the expiry out of range.
    pub fn new(
        user: &GitHubUser,
        email: Option<String>,
        github_token: String,
        lifetime_seconds: i64,
    ) -> Result<Self> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(lifetime_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "session lifetime of {lifetime_seconds}s is out of range"
                ))
            })?;

        Ok(Self {
            sub: user.id.to_string(),
            login: user.login.clone(),
            name: user.display_name().to_string(),
            email,
            avatar: user.avatar_url.clone(),
            github_token,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })
    }
}

/// Create a signed session token (compact HS256 JWT)
pub fn create_session_token(claims: &SessionClaims, secret: &str) -> Result<String> {
    encode(
        &Header::new(ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::TokenSigning(e.to_string()))
}

/// Verify and decode a session token
///
/// # Errors
/// `AppError::InvalidToken` for any structural, signature or expiry failure.
/// Callers get no hint about which check failed.
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims> {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Session token rejected");
        AppError::InvalidToken
    })?;

    Ok(token_data.claims)
}
