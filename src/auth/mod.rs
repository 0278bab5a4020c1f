//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Email resolution
//! - Session tokens
//! - Authentication middleware

mod cookies;
pub mod email;
pub mod github;
mod middleware;
mod oauth;
pub mod session;

pub use email::{EmailCandidate, EmailSource, ResolvedEmail, resolve_email};
pub use github::{GitHubClient, GitHubUser};
pub use middleware::{CurrentUser, require_auth};
pub use oauth::{LoginFailure, auth_router};
pub use session::{SessionClaims, create_session_token, verify_session_token};
