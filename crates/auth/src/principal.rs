use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use warden_core::UserId;

use crate::{Permission, Role};

/// The authenticated identity attached to a request.
///
/// Built once by the token service from verified claims and immutable for
/// the lifetime of the request. Legacy identifier aliasing (`sub` vs `uid`)
/// is resolved during construction, never downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    /// Personal permission overrides granted on top of the role.
    pub extra_permissions: HashSet<Permission>,
}

impl Principal {
    pub fn new(id: UserId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            extra_permissions: HashSet::new(),
        }
    }

    pub fn with_extra_permissions(
        mut self,
        extra: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.extra_permissions = extra.into_iter().collect();
        self
    }
}

/// Request identity: either a verified principal or an anonymous guest.
///
/// Missing credentials produce `Guest` rather than an error; whether a guest
/// may proceed is the guard's decision, not the authenticator's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest,
    User(Principal),
}

impl Identity {
    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Guest => None,
            Identity::User(p) => Some(p),
        }
    }
}
