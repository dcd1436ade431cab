use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "BLOG:MANAGE").
/// The special wildcard permission `"*"` means "all permissions" and lets
/// policy layers express full access without enumerating domain keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub const fn wildcard() -> Self {
        Self::from_static("*")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static catalog of permission keys known to the deployment.
///
/// Business routes reference these in their rule-table entries; the catalog
/// itself is not exhaustive (keys are opaque strings), it exists so in-tree
/// policy and tests share one spelling.
pub mod catalog {
    use super::Permission;

    /// Grants every permission, including ones added later.
    pub const ALL: Permission = Permission::from_static("*");

    pub const BLOG_MANAGE: Permission = Permission::from_static("BLOG:MANAGE");
    pub const FITNESS_READ_ALL: Permission = Permission::from_static("FITNESS:READ_ALL");
    pub const FILE_UPLOAD: Permission = Permission::from_static("FILE:UPLOAD");
    pub const USER_MANAGE: Permission = Permission::from_static("USER:MANAGE");
    pub const ROLE_MANAGE: Permission = Permission::from_static("ROLE:MANAGE");
    pub const AUDIT_VIEW: Permission = Permission::from_static("AUDIT:VIEW");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_recognized() {
        assert!(Permission::wildcard().is_wildcard());
        assert!(!catalog::BLOG_MANAGE.is_wildcard());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&catalog::ROLE_MANAGE).unwrap();
        assert_eq!(json, "\"ROLE:MANAGE\"");
    }
}
