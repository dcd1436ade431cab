//! Permission resolution: role grants merged with personal overrides.
//!
//! The resolver works against an immutable snapshot of the role → permission
//! mapping. The reloadable cache that produces snapshots lives in
//! `warden-infra`; keeping the merge logic here keeps it pure and testable.

use std::collections::{HashMap, HashSet};

use crate::{Permission, Principal, Role, RoleDefinition};

/// One consistent view of the role store.
///
/// Readers always hold a whole snapshot; a reload swaps the snapshot as a
/// unit, never field by field.
pub type RoleSnapshot = HashMap<Role, HashSet<Permission>>;

/// Build a snapshot from role definitions.
pub fn snapshot_from(defs: impl IntoIterator<Item = RoleDefinition>) -> RoleSnapshot {
    defs.into_iter()
        .map(|def| (def.name, def.permissions))
        .collect()
}

/// Role permissions ∪ personal overrides.
///
/// An unknown role grants nothing; it is not an error. A request must never
/// fail because an operator deleted a role out from under a live token.
pub fn effective_permissions(snapshot: &RoleSnapshot, principal: &Principal) -> HashSet<Permission> {
    let mut effective: HashSet<Permission> = snapshot
        .get(&principal.role)
        .cloned()
        .unwrap_or_default();
    effective.extend(principal.extra_permissions.iter().cloned());
    effective
}

/// Membership query: wildcard held, or the key literally present.
pub fn has_permission(snapshot: &RoleSnapshot, principal: &Principal, key: &Permission) -> bool {
    let wildcard = Permission::wildcard();
    let in_set = |set: &HashSet<Permission>| set.contains(key) || set.contains(&wildcard);

    if in_set(&principal.extra_permissions) {
        return true;
    }
    snapshot.get(&principal.role).is_some_and(in_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::catalog;
    use warden_core::UserId;

    fn snapshot() -> RoleSnapshot {
        snapshot_from(vec![
            RoleDefinition::new(Role::new("admin"), vec![Permission::wildcard()]),
            RoleDefinition::new(
                Role::new("editor"),
                vec![catalog::BLOG_MANAGE, catalog::FILE_UPLOAD],
            ),
            RoleDefinition::new(Role::new("user"), vec![]),
        ])
    }

    fn principal(role: &'static str) -> Principal {
        Principal::new(UserId::new(), "t", Role::from_static(role))
    }

    #[test]
    fn effective_set_is_superset_of_role_grants() {
        let snap = snapshot();
        let p = principal("editor");
        let effective = effective_permissions(&snap, &p);
        for perm in snap.get(&p.role).unwrap() {
            assert!(effective.contains(perm));
        }
    }

    #[test]
    fn extra_permissions_are_unioned_in() {
        let snap = snapshot();
        let p = principal("user").with_extra_permissions(vec![catalog::FITNESS_READ_ALL]);
        let effective = effective_permissions(&snap, &p);
        assert!(effective.contains(&catalog::FITNESS_READ_ALL));
        assert!(has_permission(&snap, &p, &catalog::FITNESS_READ_ALL));
    }

    #[test]
    fn wildcard_grants_any_key() {
        let snap = snapshot();
        let p = principal("admin");
        assert!(has_permission(&snap, &p, &catalog::BLOG_MANAGE));
        assert!(has_permission(&snap, &p, &Permission::new("ANY:THING")));
    }

    #[test]
    fn unknown_role_grants_nothing_without_error() {
        let snap = snapshot();
        let p = principal("ghost");
        assert!(effective_permissions(&snap, &p).is_empty());
        assert!(!has_permission(&snap, &p, &catalog::BLOG_MANAGE));
    }

    #[test]
    fn missing_key_is_denied() {
        let snap = snapshot();
        let p = principal("user");
        assert!(!has_permission(&snap, &p, &catalog::BLOG_MANAGE));
    }
}
