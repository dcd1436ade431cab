//! Infrastructure wiring for the HTTP app.

use std::sync::Arc;

use warden_infra::{
    InMemoryRequestStore, InMemoryRoleStore, InMemorySessionRegistry, LoggingGrantEffect,
    OperationLog, RoleCache, RoleStore, SessionRegistry, TokenService, TracingOperationLog,
    WorkflowService,
};

pub struct AppServices {
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub role_store: Arc<dyn RoleStore>,
    pub roles: Arc<RoleCache>,
    pub workflow: Arc<WorkflowService>,
    pub audit: Arc<dyn OperationLog>,
}

/// Build the default single-node wiring: in-memory stores, tracing-backed
/// operation log. Deployments with external stores swap the trait objects.
pub async fn build_services(jwt_secret: &str) -> AppServices {
    let sessions: Arc<dyn SessionRegistry> = Arc::new(InMemorySessionRegistry::new());
    let role_store: Arc<dyn RoleStore> = Arc::new(InMemoryRoleStore::with_defaults());
    let audit: Arc<dyn OperationLog> = Arc::new(TracingOperationLog);

    let roles = Arc::new(RoleCache::new(role_store.clone()));
    roles.load().await;

    let tokens = Arc::new(TokenService::new(jwt_secret.as_bytes(), sessions.clone()));

    let workflow = Arc::new(WorkflowService::new(
        Arc::new(InMemoryRequestStore::new()),
        roles.clone(),
        Arc::new(LoggingGrantEffect),
        audit.clone(),
    ));

    AppServices {
        tokens,
        sessions,
        role_store,
        roles,
        workflow,
        audit,
    }
}
