//! Session revocation endpoint (admin forced logout).
//!
//! The rule table gates `/api/sessions` behind the wildcard permission.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;

use warden_infra::{AuditEntry, record_operation};

use crate::app::errors;
use crate::app::routes::{client_ip, require_principal};
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new().route("/revoke", post(revoke))
}

#[derive(Debug, Deserialize)]
pub struct RevokeBody {
    /// Token identifier (`jti`) of the session to kill.
    pub token_id: String,
}

/// POST /api/sessions/revoke — delete one session entry.
///
/// Revocation is proactive and independent of the token's signed expiry;
/// under the strict contract it takes effect on the next request, under the
/// relaxed contract it marks the session dead for registry consumers.
pub async fn revoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    headers: HeaderMap,
    Json(body): Json<RevokeBody>,
) -> Response {
    let principal = match require_principal(&identity) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.tokens.revoke(&body.token_id).await {
        Ok(existed) => {
            record_operation(
                services.audit.clone(),
                AuditEntry::new(principal.id, "session.revoke", &body.token_id)
                    .details(if existed { "revoked" } else { "not found" }.to_string())
                    .ip(client_ip(&headers)),
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({ "revoked": existed })),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "session revocation failed");
            errors::server_error()
        }
    }
}
