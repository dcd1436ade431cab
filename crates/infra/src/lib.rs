//! `warden-infra` — storage seams and services for the authorization core.
//!
//! Everything that touches I/O lives here: the session registry, the role
//! store and its reloadable cache, the token service, the permission-request
//! store, and the fire-and-forget operation log. All external stores are
//! reached through traits so deployments can swap backends.

pub mod audit;
pub mod requests;
pub mod role_cache;
pub mod role_store;
pub mod session;
pub mod token;

pub use audit::{AuditEntry, OperationLog, TracingOperationLog, record_operation};
pub use requests::{
    GrantEffect, InMemoryRequestStore, LoggingGrantEffect, PermissionRequestStore, WorkflowService,
    WorkflowServiceError,
};
pub use role_cache::RoleCache;
pub use role_store::{InMemoryRoleStore, RoleStore, StoreError};
pub use session::{InMemorySessionRegistry, SessionEntry, SessionError, SessionRegistry};
pub use token::{AuthError, TokenService, REQUIRE_LIVE_SESSION, SESSION_TTL_DAYS, TOKEN_TTL_DAYS};

#[cfg(feature = "redis")]
pub use session::RedisSessionRegistry;
