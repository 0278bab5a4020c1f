//! Identity endpoint

use axum::{Json, Router, middleware, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};

/// Public view of a session
///
/// The embedded GitHub token is deliberately absent.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub login: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar: String,
}

/// Create identity router
///
/// Routes:
/// - GET /me - Requires a bearer session token
pub fn me_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// GET /me
async fn me(CurrentUser(claims): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: claims.sub,
        login: claims.login,
        name: claims.name,
        email: claims.email,
        avatar: claims.avatar,
    })
}
