//! Permission-request store and workflow service.
//!
//! The state machine itself lives in `warden-auth::workflow`; this module
//! persists requests, checks the reviewer against the live role snapshot,
//! notifies the grant collaborator on approval, and logs both operations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use warden_auth::workflow::{self, RequestKind, RequestStatus, ReviewDecision};
use warden_auth::{PermissionRequest, Principal, WorkflowError};
use warden_core::{RequestId, UserId};

use crate::audit::{AuditEntry, OperationLog, record_operation};
use crate::role_cache::RoleCache;
use crate::role_store::StoreError;

#[async_trait]
pub trait PermissionRequestStore: Send + Sync {
    async fn insert(&self, request: PermissionRequest) -> Result<(), StoreError>;

    async fn get(&self, id: RequestId) -> Result<Option<PermissionRequest>, StoreError>;

    /// Persist a reviewed request. The caller guarantees the id exists.
    async fn update(&self, request: PermissionRequest) -> Result<(), StoreError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<PermissionRequest>, StoreError>;

    async fn list_all(&self) -> Result<Vec<PermissionRequest>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, PermissionRequest>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionRequestStore for InMemoryRequestStore {
    async fn insert(&self, request: PermissionRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<PermissionRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn update(&self, request: PermissionRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request);
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<PermissionRequest>, StoreError> {
        let requests = self.requests.read().await;
        let mut out: Vec<_> = requests
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<PermissionRequest>, StoreError> {
        let requests = self.requests.read().await;
        let mut out: Vec<_> = requests.values().cloned().collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }
}

/// Applies the effect of an approved request (grant the permission, change
/// the role). External to the workflow: the workflow records decisions, a
/// collaborator mutates identity data.
#[async_trait]
pub trait GrantEffect: Send + Sync {
    async fn apply(&self, request: &PermissionRequest) -> Result<(), StoreError>;
}

/// Default collaborator: announces the approval and leaves the mutation to
/// the external identity system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingGrantEffect;

#[async_trait]
impl GrantEffect for LoggingGrantEffect {
    async fn apply(&self, request: &PermissionRequest) -> Result<(), StoreError> {
        tracing::info!(
            request = %request.id,
            user = %request.user_id,
            target = %request.target,
            "approved grant handed off"
        );
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum WorkflowServiceError {
    #[error("request not found")]
    NotFound,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct WorkflowService {
    store: Arc<dyn PermissionRequestStore>,
    roles: Arc<RoleCache>,
    effect: Arc<dyn GrantEffect>,
    audit: Arc<dyn OperationLog>,
    /// Serializes the duplicate check with the insert; without it two
    /// concurrent submits for the same (kind, target) could both pass.
    submit_gate: Mutex<()>,
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn PermissionRequestStore>,
        roles: Arc<RoleCache>,
        effect: Arc<dyn GrantEffect>,
        audit: Arc<dyn OperationLog>,
    ) -> Self {
        Self {
            store,
            roles,
            effect,
            audit,
            submit_gate: Mutex::new(()),
        }
    }

    pub async fn submit(
        &self,
        principal: &Principal,
        kind: RequestKind,
        target: &str,
        reason: &str,
        ip: Option<String>,
    ) -> Result<PermissionRequest, WorkflowServiceError> {
        let request = {
            let _gate = self.submit_gate.lock().await;
            let existing = self.store.list_for_user(principal.id).await?;
            let request =
                workflow::submit_request(principal, kind, target, reason, &existing, Utc::now())?;
            self.store.insert(request.clone()).await?;
            request
        };

        record_operation(
            self.audit.clone(),
            AuditEntry::new(principal.id, "permission_request.submit", &request.target)
                .details(request.reason.clone())
                .ip(ip),
        );
        Ok(request)
    }

    pub async fn review(
        &self,
        reviewer: &Principal,
        id: RequestId,
        decision: ReviewDecision,
        ip: Option<String>,
    ) -> Result<PermissionRequest, WorkflowServiceError> {
        let request = self
            .store
            .get(id)
            .await?
            .ok_or(WorkflowServiceError::NotFound)?;

        let snapshot = self.roles.snapshot();
        let reviewed =
            workflow::review_request(&request, reviewer, &snapshot, decision, Utc::now())?;
        self.store.update(reviewed.clone()).await?;

        if reviewed.status == RequestStatus::Approved {
            // Grant application is best-effort from the workflow's view; the
            // decision record is already durable.
            if let Err(err) = self.effect.apply(&reviewed).await {
                tracing::warn!(request = %reviewed.id, error = %err, "grant effect failed");
            }
        }

        record_operation(
            self.audit.clone(),
            AuditEntry::new(reviewer.id, "permission_request.review", &reviewed.target)
                .details(format!("{:?} -> {:?}", decision, reviewed.status))
                .ip(ip),
        );
        Ok(reviewed)
    }

    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PermissionRequest>, WorkflowServiceError> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<PermissionRequest>, WorkflowServiceError> {
        Ok(self.store.list_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingOperationLog;
    use crate::role_store::InMemoryRoleStore;
    use warden_auth::{Role, WorkflowError};

    async fn service() -> WorkflowService {
        let roles = Arc::new(RoleCache::new(Arc::new(InMemoryRoleStore::with_defaults())));
        roles.load().await;
        WorkflowService::new(
            Arc::new(InMemoryRequestStore::new()),
            roles,
            Arc::new(LoggingGrantEffect),
            Arc::new(TracingOperationLog),
        )
    }

    fn requester() -> Principal {
        Principal::new(UserId::new(), "alice", Role::new("user"))
    }

    fn admin() -> Principal {
        Principal::new(UserId::new(), "root", Role::new("admin"))
    }

    #[tokio::test]
    async fn submit_review_approve_flow() {
        let svc = service().await;
        let p = requester();

        let request = svc
            .submit(&p, RequestKind::Permission, "BLOG:MANAGE", "editing", None)
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let reviewed = svc
            .review(&admin(), request.id, ReviewDecision::Approve, None)
            .await
            .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Approved);

        // The stored copy is the reviewed one.
        let listed = svc.list_for_user(p.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn second_review_is_invalid_state() {
        let svc = service().await;
        let request = svc
            .submit(&requester(), RequestKind::Role, "editor", "promotion", None)
            .await
            .unwrap();

        let a = admin();
        svc.review(&a, request.id, ReviewDecision::Reject, None)
            .await
            .unwrap();
        let err = svc
            .review(&a, request.id, ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowServiceError::Workflow(WorkflowError::InvalidState(RequestStatus::Rejected))
        ));
    }

    #[tokio::test]
    async fn duplicate_pending_submission_rejected() {
        let svc = service().await;
        let p = requester();
        svc.submit(&p, RequestKind::Permission, "FILE:UPLOAD", "first", None)
            .await
            .unwrap();
        let err = svc
            .submit(&p, RequestKind::Permission, "FILE:UPLOAD", "second", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowServiceError::Workflow(WorkflowError::DuplicatePending)
        ));
    }

    #[tokio::test]
    async fn concurrent_duplicate_submissions_admit_exactly_one() {
        let svc = service().await;
        let p = requester();

        let (a, b) = tokio::join!(
            svc.submit(&p, RequestKind::Permission, "BLOG:MANAGE", "first", None),
            svc.submit(&p, RequestKind::Permission, "BLOG:MANAGE", "second", None),
        );
        assert!(a.is_ok() != b.is_ok(), "exactly one submit may win");

        let listed = svc.list_for_user(p.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn non_admin_reviewer_forbidden() {
        let svc = service().await;
        let request = svc
            .submit(&requester(), RequestKind::Role, "editor", "try", None)
            .await
            .unwrap();
        let err = svc
            .review(&requester(), request.id, ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowServiceError::Workflow(WorkflowError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let svc = service().await;
        let err = svc
            .review(&admin(), RequestId::new(), ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowServiceError::NotFound));
    }
}
