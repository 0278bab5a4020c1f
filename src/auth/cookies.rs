//! OAuth state cookie
//!
//! The anti-forgery state is bound to the browser through a signed,
//! short-lived cookie scoped to the OAuth routes. The scope is the path the
//! browser uses, which includes any prefix in `server.public_url`.

use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

const STATE_COOKIE_NAME: &str = "anvil_oauth_state";

/// Create the state cookie for an authorization redirect.
pub(super) fn state_cookie(
    state: &str,
    path: String,
    secure: bool,
    max_age_seconds: i64,
) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(path)
        .max_age(Duration::seconds(max_age_seconds))
        .build()
}

/// Create the removal cookie for the state. `path` must match the one it was set with.
pub(super) fn clear_state_cookie(path: String) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path(path)
        .max_age(Duration::ZERO)
        .build()
}

/// Get the state from a verified cookie.
///
/// Returns `None` when the cookie is missing or its signature does not verify.
pub(super) fn get_state(jar: &SignedCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|state| !state.is_empty())
}
