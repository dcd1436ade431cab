//! Token service: issues and authenticates signed access tokens.
//!
//! Issue embeds a minimal principal snapshot (HS256) and writes one session
//! registry entry per token, keyed by `jti`. Authentication is access-mode
//! relaxed: a missing credential yields `Guest` and defers the allow/deny
//! decision to the guard.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use warden_auth::claims::ClaimsError;
use warden_auth::{AccessClaims, Identity, Principal, validate_claims};

use crate::session::{SessionEntry, SessionError, SessionRegistry};

/// Signed token validity.
pub const TOKEN_TTL_DAYS: i64 = 30;

/// Session registry TTL, deliberately independent of the token expiry so a
/// revocation can precede or outlive the signature window.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Revocation contract: when `false` (relaxed), a verified signature is
/// sufficient to authenticate and a missing session entry does not reject —
/// the registry exists for proactive revocation, not routine gating.
/// Flip to `true` for strict revocation (entry required on every request).
pub const REQUIRE_LIVE_SESSION: bool = false;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,

    #[error("token invalid")]
    TokenInvalid,

    #[error("token signing failed: {0}")]
    Signing(String),

    /// Registry/store unreachable: a server error, never an allow or deny.
    #[error(transparent)]
    Registry(#[from] SessionError),
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    sessions: Arc<dyn SessionRegistry>,
    token_ttl: Duration,
    session_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], sessions: Arc<dyn SessionRegistry>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            sessions,
            token_ttl: Duration::days(TOKEN_TTL_DAYS),
            session_ttl: Duration::days(SESSION_TTL_DAYS),
        }
    }

    pub fn with_ttls(mut self, token_ttl: Duration, session_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self.session_ttl = session_ttl;
        self
    }

    /// Sign a token for the principal snapshot and register its session.
    pub async fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let jti = Uuid::now_v7().to_string();
        let claims = AccessClaims {
            sub: principal.id.to_string(),
            uid: None,
            name: principal.display_name.clone(),
            role: principal.role.as_str().to_string(),
            perms: principal
                .extra_permissions
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        self.sessions
            .put(
                SessionEntry {
                    token_id: jti,
                    user_id: principal.id,
                    created_at: now,
                },
                self.session_ttl,
            )
            .await?;

        Ok(token)
    }

    /// Authenticate a raw credential (already stripped of any header scheme).
    ///
    /// - `None`/blank → `Identity::Guest`, never an error.
    /// - Bad signature or malformed claims → `TokenInvalid`; expiry →
    ///   `TokenExpired`.
    /// - Registry lookup failures propagate as `Registry` (server error).
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let Some(raw) = credential.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Identity::Guest);
        };

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` so the error taxonomy stays
        // in one place.
        validation.validate_exp = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data = jsonwebtoken::decode::<AccessClaims>(raw, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?;

        validate_claims(&data.claims, Utc::now()).map_err(|e| match e {
            ClaimsError::Expired => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;

        let session = self.sessions.get(&data.claims.jti).await?;
        if REQUIRE_LIVE_SESSION && session.is_none() {
            return Err(AuthError::TokenInvalid);
        }

        data.claims.to_identity().map_err(|_| AuthError::TokenInvalid)
    }

    /// Proactively revoke one session (admin forced logout).
    pub async fn revoke(&self, token_id: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.remove(token_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionRegistry;
    use warden_auth::{Permission, Role};
    use warden_core::UserId;

    fn service() -> (TokenService, Arc<InMemorySessionRegistry>) {
        let sessions = Arc::new(InMemorySessionRegistry::new());
        (TokenService::new(b"test-secret", sessions.clone()), sessions)
    }

    fn principal() -> Principal {
        Principal::new(UserId::new(), "Alice", Role::new("user"))
            .with_extra_permissions(vec![Permission::new("FITNESS:READ_ALL")])
    }

    #[tokio::test]
    async fn issue_then_authenticate_round_trips() {
        let (svc, _) = service();
        let p = principal();
        let token = svc.issue(&p).await.unwrap();

        let identity = svc.authenticate(Some(&token)).await.unwrap();
        let got = identity.principal().unwrap();
        assert_eq!(got.id, p.id);
        assert_eq!(got.role, p.role);
        assert_eq!(got.extra_permissions, p.extra_permissions);
    }

    #[tokio::test]
    async fn missing_credential_is_guest_not_error() {
        let (svc, _) = service();
        assert_eq!(svc.authenticate(None).await.unwrap(), Identity::Guest);
        assert_eq!(svc.authenticate(Some("  ")).await.unwrap(), Identity::Guest);
    }

    #[tokio::test]
    async fn garbage_credential_is_invalid() {
        let (svc, _) = service();
        let err = svc.authenticate(Some("not-a-jwt")).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let (svc, _) = service();
        let other = TokenService::new(b"other-secret", Arc::new(InMemorySessionRegistry::new()));
        let token = other.issue(&principal()).await.unwrap();
        let err = svc.authenticate(Some(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let (svc, _) = service();
        let now = Utc::now();
        let claims = AccessClaims {
            sub: UserId::new().to_string(),
            uid: None,
            name: "Old".to_string(),
            role: "user".to_string(),
            perms: vec![],
            jti: "stale".to_string(),
            iat: (now - Duration::days(2)).timestamp(),
            exp: (now - Duration::days(1)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = svc.authenticate(Some(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn issue_writes_one_session_per_token() {
        let (svc, sessions) = service();
        let p = principal();
        let t1 = svc.issue(&p).await.unwrap();
        let t2 = svc.issue(&p).await.unwrap();
        assert_ne!(t1, t2);

        // Both sessions are live: logging in twice never evicts a device.
        for token in [&t1, &t2] {
            let data = jsonwebtoken::decode::<AccessClaims>(
                token,
                &DecodingKey::from_secret(b"test-secret"),
                &Validation::new(Algorithm::HS256),
            )
            .unwrap();
            let entry = sessions.get(&data.claims.jti).await.unwrap().unwrap();
            assert_eq!(entry.user_id, p.id);
        }
    }

    struct FailingRegistry;

    #[async_trait::async_trait]
    impl SessionRegistry for FailingRegistry {
        async fn put(&self, _entry: SessionEntry, _ttl: Duration) -> Result<(), SessionError> {
            Err(SessionError::Unavailable("registry down".to_string()))
        }

        async fn get(&self, _token_id: &str) -> Result<Option<SessionEntry>, SessionError> {
            Err(SessionError::Unavailable("registry down".to_string()))
        }

        async fn remove(&self, _token_id: &str) -> Result<bool, SessionError> {
            Err(SessionError::Unavailable("registry down".to_string()))
        }
    }

    #[tokio::test]
    async fn registry_lookup_failure_is_a_registry_error_not_a_decision() {
        let svc = TokenService::new(b"test-secret", Arc::new(FailingRegistry));
        let now = Utc::now();
        let claims = AccessClaims {
            sub: UserId::new().to_string(),
            uid: None,
            name: "Alice".to_string(),
            role: "user".to_string(),
            perms: vec![],
            jti: "live".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(1)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        // A perfectly valid token must not be allowed or denied when the
        // registry is unreachable; the failure has to surface.
        let err = svc.authenticate(Some(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::Registry(_)));
    }

    #[tokio::test]
    async fn issue_fails_when_registry_write_fails() {
        let svc = TokenService::new(b"test-secret", Arc::new(FailingRegistry));
        let err = svc.issue(&principal()).await.unwrap_err();
        assert!(matches!(err, AuthError::Registry(_)));
    }

    #[tokio::test]
    async fn revoked_session_still_authenticates_under_relaxed_contract() {
        // Pinned behavior for REQUIRE_LIVE_SESSION = false: a verified
        // signature is sufficient even after the session entry is gone.
        let (svc, _) = service();
        let token = svc.issue(&principal()).await.unwrap();

        let data = jsonwebtoken::decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert!(svc.revoke(&data.claims.jti).await.unwrap());

        let identity = svc.authenticate(Some(&token)).await.unwrap();
        assert!(!identity.is_guest());
    }
}
