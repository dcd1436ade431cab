//! Role administration endpoints.
//!
//! Access is enforced by the rule table (`/api/rbac` requires
//! `ROLE:MANAGE`); handlers assume an authorized principal and focus on the
//! store mutation plus the cache reload that makes it visible.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;

use warden_auth::{Role, RoleDefinition};
use warden_infra::{AuditEntry, record_operation};

use crate::app::routes::{client_ip, require_principal};
use crate::app::services::AppServices;
use crate::app::errors;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/:name", put(upsert_role))
        .route("/reload", post(reload_cache))
}

#[derive(Debug, Deserialize)]
pub struct UpsertRoleBody {
    pub permissions: Vec<String>,
}

/// GET /api/rbac/roles — all role definitions from the backing store.
pub async fn list_roles(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.role_store.load_all().await {
        Ok(mut roles) => {
            roles.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
            (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "role store read failed");
            errors::server_error()
        }
    }
}

/// PUT /api/rbac/roles/:name — create or replace a role definition, then
/// reload the cache so the new grants take effect atomically.
pub async fn upsert_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpsertRoleBody>,
) -> Response {
    let principal = match require_principal(&identity) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let def = RoleDefinition::new(
        Role::new(name.clone()),
        body.permissions
            .into_iter()
            .map(warden_auth::Permission::new),
    );

    if let Err(err) = services.role_store.upsert(def.clone()).await {
        tracing::error!(error = %err, "role upsert failed");
        return errors::server_error();
    }
    if let Err(err) = services.roles.reload().await {
        tracing::error!(error = %err, "role cache reload after upsert failed");
        return errors::server_error();
    }

    record_operation(
        services.audit.clone(),
        AuditEntry::new(principal.id, "rbac.role.upsert", &name)
            .details(format!("{} permission(s)", def.permissions.len()))
            .ip(client_ip(&headers)),
    );

    (StatusCode::OK, Json(serde_json::json!({ "role": def }))).into_response()
}

/// POST /api/rbac/reload — explicit role cache refresh.
pub async fn reload_cache(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    headers: HeaderMap,
) -> Response {
    let principal = match require_principal(&identity) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.roles.reload().await {
        Ok(count) => {
            record_operation(
                services.audit.clone(),
                AuditEntry::new(principal.id, "rbac.cache.reload", "roles")
                    .details(format!("{count} role(s)"))
                    .ip(client_ip(&headers)),
            );
            (StatusCode::OK, Json(serde_json::json!({ "roles": count }))).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "role cache reload failed");
            errors::server_error()
        }
    }
}
