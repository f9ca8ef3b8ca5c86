//! # Token Claims
//!
//! Reads the claims embedded in a session token without verifying its
//! signature. The client never holds the signing key, so the claims are only
//! used for local decisions: skipping a probe for an already-expired token
//! and showing admin affordances. The server remains the authority.
//!
//! Any token that cannot be decoded, or has no `exp`, counts as expired.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use shop_core::Token;

use crate::error::{ClientError, ClientResult};

/// A role claim may be a single name, a list of names, or a list of
/// `{"authority": "ROLE_X"}` objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RoleClaim {
    One(String),
    Many(Vec<RoleEntry>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RoleEntry {
    Name(String),
    Authority { authority: String },
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    exp: i64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    role: Option<RoleClaim>,
    #[serde(default)]
    roles: Option<RoleClaim>,
    #[serde(default)]
    authorities: Option<RoleClaim>,
}

/// The claims the client cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    pub subject: Option<String>,
    /// Role names from `role`, `roles` and `authorities`, as sent.
    pub roles: Vec<String>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.exp.saturating_mul(1000)
    }

    /// Case-insensitive match that ignores a `ROLE_` prefix on either side.
    pub fn has_role(&self, role: &str) -> bool {
        let wanted = normalize_role(role);
        self.roles.iter().any(|r| normalize_role(r) == wanted)
    }
}

fn normalize_role(role: &str) -> String {
    let upper = role.trim().to_ascii_uppercase();
    upper
        .strip_prefix("ROLE_")
        .map(str::to_string)
        .unwrap_or(upper)
}

fn collect_roles(claim: Option<RoleClaim>, out: &mut Vec<String>) {
    match claim {
        Some(RoleClaim::One(name)) => out.push(name),
        Some(RoleClaim::Many(entries)) => {
            out.extend(entries.into_iter().map(|entry| match entry {
                RoleEntry::Name(name) => name,
                RoleEntry::Authority { authority } => authority,
            }))
        }
        None => {}
    }
}

/// Decodes the claims of `token`.
pub fn decode_claims(token: &Token) -> ClientResult<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<RawClaims>(token.as_str(), &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| ClientError::InvalidToken(e.to_string()))?;

    let raw = data.claims;
    let mut roles = Vec::new();
    collect_roles(raw.role, &mut roles);
    collect_roles(raw.roles, &mut roles);
    collect_roles(raw.authorities, &mut roles);

    Ok(TokenClaims {
        exp: raw.exp,
        subject: raw.sub,
        roles,
    })
}

/// True for an absent token, an undecodable token, or one whose `exp` has
/// been reached.
pub fn is_expired(token: Option<&Token>, now: DateTime<Utc>) -> bool {
    let Some(token) = token else {
        return true;
    };

    match decode_claims(token) {
        Ok(claims) => claims.is_expired_at(now),
        Err(e) => {
            debug!(error = %e, "Treating undecodable token as expired");
            true
        }
    }
}
