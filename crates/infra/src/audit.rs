//! Operation log collaborator.
//!
//! The authorization core only ever *writes* audit records, and writing is
//! fire-and-forget: a failing log line must never block or fail the request
//! that produced it.

use async_trait::async_trait;
use serde::Serialize;

use warden_core::UserId;

use crate::role_store::StoreError;

/// Fixed payload shape handed to the collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub operator: UserId,
    pub action: String,
    pub target: String,
    pub details: String,
    pub ip: Option<String>,
}

impl AuditEntry {
    pub fn new(operator: UserId, action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            operator,
            action: action.into(),
            target: target.into(),
            details: String::new(),
            ip: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

#[async_trait]
pub trait OperationLog: Send + Sync {
    async fn log_operation(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

/// Default collaborator: emits the entry as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOperationLog;

#[async_trait]
impl OperationLog for TracingOperationLog {
    async fn log_operation(&self, entry: AuditEntry) -> Result<(), StoreError> {
        tracing::info!(
            operator = %entry.operator,
            action = %entry.action,
            target = %entry.target,
            details = %entry.details,
            ip = entry.ip.as_deref().unwrap_or("-"),
            "operation"
        );
        Ok(())
    }
}

/// Dispatch an entry without awaiting it in the request path.
///
/// Errors are demoted to a warning; the caller's outcome is already decided.
pub fn record_operation(log: std::sync::Arc<dyn OperationLog>, entry: AuditEntry) {
    tokio::spawn(async move {
        if let Err(err) = log.log_operation(entry).await {
            tracing::warn!(error = %err, "operation log write failed");
        }
    });
}
