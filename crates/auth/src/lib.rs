//! `warden-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it holds the
//! permission/role model, the declarative route rule table, the guard
//! decision algorithm, claim validation, and the permission-request state
//! machine. All I/O lives in `warden-infra`.

pub mod claims;
pub mod guard;
pub mod permissions;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod rules;
pub mod workflow;

pub use claims::{AccessClaims, ClaimsError, validate_claims};
pub use guard::{Guard, GuardError, UnmatchedPolicy};
pub use permissions::Permission;
pub use principal::{Identity, Principal};
pub use resolver::{RoleSnapshot, effective_permissions, has_permission};
pub use roles::{Role, RoleDefinition};
pub use rules::{MethodMatcher, RouteMatcher, RouteRule, RuleConfig, RuleError, RuleTable};
pub use workflow::{
    PermissionRequest, RequestKind, RequestStatus, ReviewDecision, WorkflowError, review_request,
    submit_request,
};
