//! Permission request workflow.
//!
//! A principal asks for an elevated permission or a role change; an admin
//! approves or rejects. The state machine is deliberately tiny:
//! `pending → approved` and `pending → rejected`, each reachable exactly
//! once. Applying an approved grant is a collaborator's job — this module
//! only records the decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::{DomainError, RequestId, UserId};

use crate::resolver::{self, RoleSnapshot};
use crate::{Permission, Principal};

/// What the requester is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// An extra permission key on top of the current role.
    Permission,
    /// A change to another role.
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// A privilege-escalation request.
///
/// Never regresses from a terminal state: `reviewed_by`/`reviewed_at` are
/// written once, together with the terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub kind: RequestKind,
    pub target: String,
    pub reason: String,
    pub status: RequestStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Reviewer lacks the wildcard permission.
    #[error("unauthorized reviewer")]
    Forbidden,

    /// Transition attempted from a non-pending state.
    #[error("request is not pending (status: {0:?})")]
    InvalidState(RequestStatus),

    /// Same user already has a pending request for the same target.
    #[error("a pending request for this target already exists")]
    DuplicatePending,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Create a new request in `pending`.
///
/// `existing_pending` is the caller's current pending requests; a second
/// pending request for the same (kind, target) is rejected so the review
/// queue never accumulates duplicates. Different targets may coexist.
pub fn submit_request(
    principal: &Principal,
    kind: RequestKind,
    target: &str,
    reason: &str,
    existing_pending: &[PermissionRequest],
    now: DateTime<Utc>,
) -> Result<PermissionRequest, WorkflowError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(DomainError::validation("target cannot be empty").into());
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("reason cannot be empty").into());
    }

    let duplicate = existing_pending.iter().any(|r| {
        r.status == RequestStatus::Pending && r.kind == kind && r.target == target
    });
    if duplicate {
        return Err(WorkflowError::DuplicatePending);
    }

    Ok(PermissionRequest {
        id: RequestId::new(),
        user_id: principal.id,
        kind,
        target: target.to_string(),
        reason: reason.to_string(),
        status: RequestStatus::Pending,
        reviewed_by: None,
        reviewed_at: None,
        created_at: now,
    })
}

/// Apply a review decision, returning the updated request.
///
/// Only wildcard holders may review. The returned value is the sole place
/// `status`/`reviewed_by`/`reviewed_at` change; callers persist it as-is.
pub fn review_request(
    request: &PermissionRequest,
    reviewer: &Principal,
    snapshot: &RoleSnapshot,
    decision: ReviewDecision,
    now: DateTime<Utc>,
) -> Result<PermissionRequest, WorkflowError> {
    if !resolver::has_permission(snapshot, reviewer, &Permission::wildcard()) {
        return Err(WorkflowError::Forbidden);
    }

    if request.status.is_terminal() {
        return Err(WorkflowError::InvalidState(request.status));
    }

    let mut reviewed = request.clone();
    reviewed.status = match decision {
        ReviewDecision::Approve => RequestStatus::Approved,
        ReviewDecision::Reject => RequestStatus::Rejected,
    };
    reviewed.reviewed_by = Some(reviewer.id);
    reviewed.reviewed_at = Some(now);
    Ok(reviewed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::snapshot_from;
    use crate::{Role, RoleDefinition};

    fn requester() -> Principal {
        Principal::new(UserId::new(), "alice", Role::new("user"))
    }

    fn admin() -> Principal {
        Principal::new(UserId::new(), "root", Role::new("admin"))
    }

    fn snapshot() -> RoleSnapshot {
        snapshot_from(vec![
            RoleDefinition::new(Role::new("admin"), vec![Permission::wildcard()]),
            RoleDefinition::new(Role::new("user"), vec![]),
        ])
    }

    fn pending() -> PermissionRequest {
        submit_request(
            &requester(),
            RequestKind::Permission,
            "BLOG:MANAGE",
            "need to edit posts",
            &[],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn submit_creates_pending() {
        let r = pending();
        assert_eq!(r.status, RequestStatus::Pending);
        assert!(r.reviewed_by.is_none());
        assert!(r.reviewed_at.is_none());
    }

    #[test]
    fn submit_rejects_blank_inputs() {
        let p = requester();
        let err = submit_request(&p, RequestKind::Role, " ", "reason", &[], Utc::now());
        assert!(matches!(err, Err(WorkflowError::Domain(_))));
        let err = submit_request(&p, RequestKind::Role, "admin", "", &[], Utc::now());
        assert!(matches!(err, Err(WorkflowError::Domain(_))));
    }

    #[test]
    fn duplicate_pending_target_rejected() {
        let p = requester();
        let first = pending();
        let err = submit_request(
            &p,
            RequestKind::Permission,
            "BLOG:MANAGE",
            "again",
            std::slice::from_ref(&first),
            Utc::now(),
        );
        assert_eq!(err, Err(WorkflowError::DuplicatePending));
    }

    #[test]
    fn different_targets_may_coexist() {
        let p = requester();
        let first = pending();
        let second = submit_request(
            &p,
            RequestKind::Permission,
            "FILE:UPLOAD",
            "uploads too",
            std::slice::from_ref(&first),
            Utc::now(),
        );
        assert!(second.is_ok());
    }

    #[test]
    fn approve_records_reviewer_and_time() {
        let admin = admin();
        let r = pending();
        let reviewed =
            review_request(&r, &admin, &snapshot(), ReviewDecision::Approve, Utc::now()).unwrap();
        assert_eq!(reviewed.status, RequestStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(admin.id));
        assert!(reviewed.reviewed_at.is_some());
    }

    #[test]
    fn reject_is_terminal_too() {
        let reviewed = review_request(
            &pending(),
            &admin(),
            &snapshot(),
            ReviewDecision::Reject,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Rejected);
    }

    #[test]
    fn second_review_fails_with_invalid_state() {
        let snap = snapshot();
        let admin = admin();
        let approved = review_request(
            &pending(),
            &admin,
            &snap,
            ReviewDecision::Approve,
            Utc::now(),
        )
        .unwrap();

        let err = review_request(&approved, &admin, &snap, ReviewDecision::Reject, Utc::now());
        assert_eq!(
            err,
            Err(WorkflowError::InvalidState(RequestStatus::Approved))
        );
    }

    #[test]
    fn non_wildcard_reviewer_forbidden() {
        let err = review_request(
            &pending(),
            &requester(),
            &snapshot(),
            ReviewDecision::Approve,
            Utc::now(),
        );
        assert_eq!(err, Err(WorkflowError::Forbidden));
    }
}
