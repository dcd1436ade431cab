//! HTTP application wiring (Axum router + middleware stack).
//!
//! Layer order matters: authentication runs first and attaches the request
//! identity, the guard runs second and short-circuits denials, handlers run
//! last. The rule table is built once here and immutable afterwards.

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router, routing::get};

use warden_auth::{Guard, RuleConfig, RuleTable, UnmatchedPolicy};

use crate::middleware::{self, AuthState, GuardState};

pub mod errors;
pub mod routes;
pub mod services;

/// Policy table shipped with the service.
///
/// Business deployments replace this via a rules file; the entries here
/// cover the service's own endpoints. Exact-method rules are listed before
/// their `ALL` counterparts so the stable sort keeps them first.
pub fn default_rule_config() -> Vec<RuleConfig> {
    vec![
        RuleConfig::regex("/api/permission-requests/[^/]+/review")
            .method("POST")
            .requires("*"),
        RuleConfig::prefix("/api/permission-requests"),
        RuleConfig::prefix("/api/rbac").requires("ROLE:MANAGE"),
        RuleConfig::prefix("/api/sessions").requires("*"),
        RuleConfig::prefix("/health").method("GET").public(),
    ]
}

/// Build the full router with the default rule table and fail-open policy.
pub async fn build_app(jwt_secret: String) -> anyhow::Result<Router> {
    build_app_with(jwt_secret, default_rule_config(), UnmatchedPolicy::default()).await
}

/// Build the router with an explicit rule table and unmatched-route policy.
pub async fn build_app_with(
    jwt_secret: String,
    rules: Vec<RuleConfig>,
    unmatched: UnmatchedPolicy,
) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(&jwt_secret).await);

    let table = RuleTable::build(rules).context("invalid route rule configuration")?;
    tracing::info!(rules = table.len(), policy = ?unmatched, "route guard configured");
    let guard = Arc::new(Guard::new(table, unmatched));

    let auth_state = AuthState {
        tokens: services.tokens.clone(),
    };
    let guard_state = GuardState {
        guard,
        roles: services.roles.clone(),
    };

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            guard_state,
            middleware::guard_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        )))
}
