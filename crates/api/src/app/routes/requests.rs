//! Permission-request endpoints.
//!
//! Submission and own-list are login-only; the review endpoint is gated by a
//! wildcard rule in the table, and the workflow re-checks the reviewer so
//! the invariant holds even if a deployment misconfigures its table.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;

use warden_auth::workflow::{RequestKind, ReviewDecision};
use warden_auth::{permissions::catalog, resolver};
use warden_core::RequestId;

use crate::app::errors;
use crate::app::routes::{client_ip, require_principal};
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new()
        .route("/api/permission-requests", post(submit).get(list))
        .route("/api/permission-requests/:id/review", post(review))
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub kind: RequestKind,
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub decision: ReviewDecision,
}

/// POST /api/permission-requests — create a pending escalation request.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    headers: HeaderMap,
    Json(body): Json<SubmitBody>,
) -> Response {
    let principal = match require_principal(&identity) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services
        .workflow
        .submit(
            &principal,
            body.kind,
            &body.target,
            &body.reason,
            client_ip(&headers),
        )
        .await
    {
        Ok(request) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "request": request })),
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// GET /api/permission-requests — own requests; the whole queue for
/// principals holding `ROLE:MANAGE`.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let principal = match require_principal(&identity) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let snapshot = services.roles.snapshot();
    let result = if resolver::has_permission(&snapshot, &principal, &catalog::ROLE_MANAGE) {
        services.workflow.list_all().await
    } else {
        services.workflow.list_for_user(principal.id).await
    };

    match result {
        Ok(requests) => (
            StatusCode::OK,
            Json(serde_json::json!({ "requests": requests })),
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

/// POST /api/permission-requests/:id/review — approve or reject once.
pub async fn review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReviewBody>,
) -> Response {
    let principal = match require_principal(&identity) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let Ok(id) = id.parse::<RequestId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id");
    };

    match services
        .workflow
        .review(&principal, id, body.decision, client_ip(&headers))
        .await
    {
        Ok(request) => (
            StatusCode::OK,
            Json(serde_json::json!({ "request": request })),
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}
