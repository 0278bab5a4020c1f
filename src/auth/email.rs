//! Email resolution
//!
//! Picks the address a user can actually be reached at from the list
//! GitHub returns, preferring real mailboxes over the private relay.

use serde::Deserialize;

/// Domain of GitHub's auto-generated private relay addresses
pub const RELAY_DOMAIN: &str = "users.noreply.github.com";

/// One entry of `GET /user/emails`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailCandidate {
    #[serde(rename = "email")]
    pub address: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub visibility: Option<String>,
}

impl EmailCandidate {
    /// Whether this is a GitHub privacy relay address
    pub fn is_relay(&self) -> bool {
        self.address
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(RELAY_DOMAIN))
    }

    fn is_primary_verified(&self) -> bool {
        self.primary && self.verified
    }
}

/// Which rule produced the resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSource {
    PrimaryVerified,
    Verified,
    PrimaryVerifiedRelay,
    VerifiedRelay,
    Profile,
}

impl EmailSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailSource::PrimaryVerified => "primary_verified",
            EmailSource::Verified => "verified",
            EmailSource::PrimaryVerifiedRelay => "primary_verified_relay",
            EmailSource::VerifiedRelay => "verified_relay",
            EmailSource::Profile => "profile",
        }
    }
}

/// Result of [`resolve_email`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmail {
    pub address: Option<String>,
    pub source: EmailSource,
}

/// Resolve the canonical email, first match wins:
///
/// 1. primary, verified, not a relay
/// 2. verified, not a relay
/// 3. primary, verified
/// 4. verified
/// 5. the profile's public email, unchanged (may be `None`)
pub fn resolve_email(candidates: &[EmailCandidate], profile_email: Option<&str>) -> ResolvedEmail {
    let tiers: [(EmailSource, fn(&EmailCandidate) -> bool); 4] = [
        (EmailSource::PrimaryVerified, |c: &EmailCandidate| {
            c.is_primary_verified() && !c.is_relay()
        }),
        (EmailSource::Verified, |c: &EmailCandidate| {
            c.verified && !c.is_relay()
        }),
        (EmailSource::PrimaryVerifiedRelay, |c: &EmailCandidate| {
            c.is_primary_verified()
        }),
        (EmailSource::VerifiedRelay, |c: &EmailCandidate| c.verified),
    ];

    tiers
        .into_iter()
        .find_map(|(source, rule)| {
            candidates
                .iter()
                .find(|&candidate| rule(candidate))
                .map(|candidate| ResolvedEmail {
                    address: Some(candidate.address.clone()),
                    source,
                })
        })
        .unwrap_or_else(|| ResolvedEmail {
            address: profile_email.map(str::to_string),
            source: EmailSource::Profile,
        })
}
