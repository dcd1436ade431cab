use axum::Router;
use axum::http::HeaderMap;
use axum::response::Response;

use warden_auth::Principal;

use crate::app::errors;
use crate::context::RequestIdentity;

pub mod rbac;
pub mod requests;
pub mod sessions;
pub mod system;

/// All authenticated API routes (the guard middleware is layered on top by
/// the app builder).
pub fn router() -> Router {
    Router::new()
        .merge(requests::router())
        .nest("/api/rbac", rbac::router())
        .nest("/api/sessions", sessions::router())
}

/// Fetch the verified principal from the request extension.
///
/// The guard already rejects guests on these routes; this is the typed
/// accessor, with a defensive 401 should a route ever be wired public.
pub fn require_principal(identity: &RequestIdentity) -> Result<Principal, Response> {
    identity
        .identity()
        .principal()
        .cloned()
        .ok_or_else(errors::login_required)
}

/// Best-effort client address for audit entries.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
