use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::UserId;

use crate::{Identity, Permission, Principal, Role};

/// JWT claims model (transport-agnostic).
///
/// This is the minimal principal snapshot the service embeds when issuing a
/// token. `uid` is a legacy alias of `sub` kept for tokens minted by older
/// deployments; `normalized_subject` resolves the two to one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject / user identifier.
    pub sub: String,

    /// Legacy alias of `sub`. Older tokens carry only this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Display name snapshot.
    #[serde(default)]
    pub name: String,

    /// Role name granted at issue time.
    pub role: String,

    /// Personal permission overrides snapshot.
    #[serde(default)]
    pub perms: Vec<String>,

    /// Token identifier; keys the session registry entry.
    pub jti: String,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token carries no usable subject")]
    MissingSubject,

    #[error("token subject is not a valid identifier: {0}")]
    InvalidSubject(String),
}

/// Deterministically validate the claim time window.
///
/// Signature verification is the token service's job; this checks only the
/// decoded claims, with the clock passed in so tests stay deterministic.
pub fn validate_claims(claims: &AccessClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    if claims.exp <= claims.iat {
        return Err(ClaimsError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(ClaimsError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(ClaimsError::Expired);
    }
    Ok(())
}

impl AccessClaims {
    /// Resolve the two historical subject spellings to one identifier.
    ///
    /// `sub` wins when both are present; an empty `sub` falls back to `uid`.
    pub fn normalized_subject(&self) -> Result<UserId, ClaimsError> {
        let raw = if !self.sub.trim().is_empty() {
            self.sub.trim()
        } else {
            self.uid
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(ClaimsError::MissingSubject)?
        };

        raw.parse::<UserId>()
            .map_err(|_| ClaimsError::InvalidSubject(raw.to_string()))
    }

    /// Build the request principal from verified claims.
    pub fn to_principal(&self) -> Result<Principal, ClaimsError> {
        let id = self.normalized_subject()?;
        let principal = Principal::new(id, self.name.clone(), Role::new(self.role.clone()))
            .with_extra_permissions(self.perms.iter().cloned().map(Permission::new));
        Ok(principal)
    }

    pub fn to_identity(&self) -> Result<Identity, ClaimsError> {
        Ok(Identity::User(self.to_principal()?))
    }
}
