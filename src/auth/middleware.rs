//! Authentication middleware
//!
//! Protects routes that require a session token.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use super::session::{SessionClaims, verify_session_token};
use crate::AppState;
use crate::error::AppError;

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Verify the request's bearer token.
///
/// A missing header is `Unauthorized`; anything wrong with the token
/// itself is `InvalidToken`.
fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<SessionClaims, AppError> {
    let token = extract_bearer_token(headers).ok_or(AppError::Unauthorized)?;
    verify_session_token(token, &state.config.auth.session_secret)
}

/// Middleware to require authentication
///
/// Verifies the bearer token and adds the claims to request extensions.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/me", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(request.headers(), &state)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// Reuses claims left by `require_auth`, or verifies the header itself.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(claims): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", claims.login)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionClaims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<SessionClaims>().cloned() {
            return Ok(CurrentUser(claims));
        }

        let state = AppState::from_ref(state);
        let claims = authenticate(&parts.headers, &state)?;
        parts.extensions.insert(claims.clone());

        Ok(CurrentUser(claims))
    }
}
