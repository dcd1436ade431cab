//! Consistent error responses.
//!
//! The denial body shapes are part of the external contract and must not
//! drift: clients key on `msg`/`message`/`required` exactly as written.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use warden_auth::{Permission, WorkflowError};
use warden_infra::WorkflowServiceError;

/// 401 for a guest on a private route.
pub fn login_required() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "msg": "Unauthorized: Login required" })),
    )
        .into_response()
}

/// 403 carrying the missing permission key.
pub fn permission_denied(required: &Permission) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "msg": "Permission Denied", "required": required.as_str() })),
    )
        .into_response()
}

/// 401 for an expired credential.
pub fn token_expired() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Token Expired" })),
    )
        .into_response()
}

/// 401 for a malformed or badly signed credential.
pub fn token_invalid() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Token Invalid" })),
    )
        .into_response()
}

/// 500 for registry/store failures. Never a silent allow or deny.
pub fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "msg": "Internal Server Error" })),
    )
        .into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn workflow_error_to_response(err: WorkflowServiceError) -> Response {
    match err {
        WorkflowServiceError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "request not found")
        }
        WorkflowServiceError::Workflow(WorkflowError::Forbidden) => {
            permission_denied(&Permission::wildcard())
        }
        WorkflowServiceError::Workflow(WorkflowError::InvalidState(status)) => json_error(
            StatusCode::CONFLICT,
            "invalid_state",
            format!("request is not pending (status: {status:?})"),
        ),
        WorkflowServiceError::Workflow(WorkflowError::DuplicatePending) => json_error(
            StatusCode::CONFLICT,
            "duplicate_pending",
            "a pending request for this target already exists",
        ),
        WorkflowServiceError::Workflow(WorkflowError::Domain(e)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        WorkflowServiceError::Store(e) => {
            tracing::error!(error = %e, "request store failure");
            server_error()
        }
    }
}
