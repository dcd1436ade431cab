//! Authentication and guard middleware.
//!
//! Authentication runs first and always attaches a [`RequestIdentity`]
//! extension (guest on missing credentials). The guard then matches the
//! route rule table against (path, method) and short-circuits denials with
//! the fixed JSON bodies — handlers are never invoked on a denied request.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use warden_auth::{Guard, GuardError};
use warden_infra::{AuthError, RoleCache, TokenService};

use crate::app::errors;
use crate::context::RequestIdentity;

/// Custom token header; takes precedence over the `Authorization` header
/// when both are present.
pub const TOKEN_HEADER: &str = "x-token";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
}

#[derive(Clone)]
pub struct GuardState {
    pub guard: Arc<Guard>,
    pub roles: Arc<RoleCache>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let credential = match extract_credential(req.headers()) {
        Credential::Missing => None,
        Credential::Token(token) => Some(token),
        // A present but undecodable credential is malformed, not absent.
        Credential::Malformed => return errors::token_invalid(),
    };

    match state.tokens.authenticate(credential.as_deref()).await {
        Ok(identity) => {
            req.extensions_mut()
                .insert(RequestIdentity(Arc::new(identity)));
            next.run(req).await
        }
        Err(AuthError::TokenExpired) => errors::token_expired(),
        Err(AuthError::TokenInvalid) => errors::token_invalid(),
        Err(err) => {
            tracing::error!(error = %err, "authentication infrastructure failure");
            errors::server_error()
        }
    }
}

pub async fn guard_middleware(
    State(state): State<GuardState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let identity = req
        .extensions()
        .get::<RequestIdentity>()
        .cloned()
        .unwrap_or_else(RequestIdentity::guest);

    // Mount path + sub-path, query string excluded.
    let path = req.uri().path().to_string();
    let method = req.method().as_str().to_string();
    let snapshot = state.roles.snapshot();

    match state
        .guard
        .authorize(identity.identity(), &path, &method, &snapshot)
    {
        Ok(()) => next.run(req).await,
        Err(GuardError::Unauthenticated) => errors::login_required(),
        Err(GuardError::Forbidden(key)) => errors::permission_denied(&key),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Credential {
    /// No credential headers at all (guest access mode).
    Missing,
    Token(String),
    /// A credential header is present but not decodable (e.g. non-UTF-8).
    Malformed,
}

/// Pull the raw credential out of the request headers.
///
/// `x-token` carries the bare token; the standard header carries a
/// `Bearer` scheme. Absence is not an error, but a header that is present
/// and unreadable is `Malformed` rather than treated as absent.
fn extract_credential(headers: &HeaderMap) -> Credential {
    if let Some(value) = headers.get(TOKEN_HEADER) {
        return match value.to_str() {
            Ok(s) => Credential::Token(s.trim().to_string()),
            Err(_) => Credential::Malformed,
        };
    }

    match headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        Some(s) => Credential::Token(s.trim().to_string()),
        None => Credential::Missing,
    }
}
