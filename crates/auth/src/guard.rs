//! Global guard: resolves the first matching route rule and enforces it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Identity, Permission, RuleTable, resolver};
use crate::resolver::RoleSnapshot;

/// What to do when no rule matches a request.
///
/// The default is fail-open: unmapped routes are allowed, and deployments
/// wanting stricter behavior add an explicit catch-all rule or flip this to
/// `Deny`. Under `Deny`, unmatched routes are reserved for wildcard holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    #[default]
    Allow,
    Deny,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Guest hit a private route.
    #[error("login required")]
    Unauthenticated,

    /// Authenticated but lacking the required permission (carried here).
    #[error("missing permission '{0}'")]
    Forbidden(Permission),
}

/// Route guard over an immutable rule table.
///
/// - No I/O
/// - No panics
/// - Pure policy: the role snapshot is passed in per request.
#[derive(Debug, Clone)]
pub struct Guard {
    table: RuleTable,
    unmatched: UnmatchedPolicy,
}

impl Guard {
    pub fn new(table: RuleTable, unmatched: UnmatchedPolicy) -> Self {
        Self { table, unmatched }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Decide whether `identity` may perform `method` on `path`.
    ///
    /// `path` is the mount path plus sub-path, query string excluded.
    pub fn authorize(
        &self,
        identity: &Identity,
        path: &str,
        method: &str,
        snapshot: &RoleSnapshot,
    ) -> Result<(), GuardError> {
        let Some(rule) = self.table.match_rule(path, method) else {
            return self.unmatched(identity, snapshot);
        };

        if rule.public {
            return Ok(());
        }

        let principal = match identity {
            Identity::Guest => return Err(GuardError::Unauthenticated),
            Identity::User(p) => p,
        };

        match &rule.required {
            None => Ok(()),
            Some(key) => {
                if resolver::has_permission(snapshot, principal, key) {
                    Ok(())
                } else {
                    Err(GuardError::Forbidden(key.clone()))
                }
            }
        }
    }

    fn unmatched(&self, identity: &Identity, snapshot: &RoleSnapshot) -> Result<(), GuardError> {
        match self.unmatched {
            UnmatchedPolicy::Allow => Ok(()),
            UnmatchedPolicy::Deny => match identity {
                Identity::Guest => Err(GuardError::Unauthenticated),
                Identity::User(p) => {
                    let wildcard = Permission::wildcard();
                    if resolver::has_permission(snapshot, p, &wildcard) {
                        Ok(())
                    } else {
                        Err(GuardError::Forbidden(wildcard))
                    }
                }
            },
        }
    }
}
