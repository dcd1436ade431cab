//! Reloadable role cache.
//!
//! Owns one process-wide snapshot of the role → permission mapping. A reload
//! reads the whole store first, then swaps the snapshot as a single `Arc`
//! replacement under a short write lock: concurrent readers hold either the
//! old or the new snapshot in full, never a mix.

use std::sync::{Arc, RwLock};

use warden_auth::resolver::{RoleSnapshot, snapshot_from};

use crate::role_store::{RoleStore, StoreError};

pub struct RoleCache {
    store: Arc<dyn RoleStore>,
    snapshot: RwLock<Arc<RoleSnapshot>>,
}

impl RoleCache {
    /// Starts empty; call [`load`](Self::load) at boot.
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(RoleSnapshot::new())),
        }
    }

    /// Initial load. A failure is logged and tolerated: the cache stays
    /// empty, resolver lookups yield no permissions, the process lives.
    pub async fn load(&self) {
        match self.reload().await {
            Ok(count) => tracing::info!(roles = count, "role cache loaded"),
            Err(err) => {
                tracing::warn!(error = %err, "initial role cache load failed; cache stays empty");
            }
        }
    }

    /// Re-read all roles and atomically swap the snapshot.
    pub async fn reload(&self) -> Result<usize, StoreError> {
        let defs = self.store.load_all().await?;
        let next = Arc::new(snapshot_from(defs));
        let count = next.len();

        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
        Ok(count)
    }

    /// Current snapshot. Cheap (one `Arc` clone); the returned snapshot stays
    /// valid even if a reload lands immediately after.
    pub fn snapshot(&self) -> Arc<RoleSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_store::InMemoryRoleStore;
    use warden_auth::{Permission, Role, RoleDefinition};

    #[tokio::test]
    async fn starts_empty_and_loads_on_demand() {
        let store = Arc::new(InMemoryRoleStore::with_defaults());
        let cache = RoleCache::new(store);
        assert!(cache.snapshot().is_empty());

        cache.load().await;
        assert!(cache.snapshot().contains_key(&Role::new("admin")));
    }

    #[tokio::test]
    async fn reload_swaps_whole_snapshot() {
        let store = Arc::new(InMemoryRoleStore::new());
        store
            .upsert(RoleDefinition::new(Role::new("a"), vec![Permission::new("X")]))
            .await
            .unwrap();

        let cache = RoleCache::new(store.clone());
        cache.reload().await.unwrap();
        let before = cache.snapshot();

        store.delete(&Role::new("a")).await.unwrap();
        store
            .upsert(RoleDefinition::new(Role::new("b"), vec![Permission::new("Y")]))
            .await
            .unwrap();
        cache.reload().await.unwrap();
        let after = cache.snapshot();

        // The old handle still sees the full pre-reload view.
        assert!(before.contains_key(&Role::new("a")));
        assert!(!before.contains_key(&Role::new("b")));
        // New reads see the full post-reload view.
        assert!(after.contains_key(&Role::new("b")));
        assert!(!after.contains_key(&Role::new("a")));
    }

    #[tokio::test]
    async fn reload_returns_role_count() {
        let store = Arc::new(InMemoryRoleStore::with_defaults());
        let cache = RoleCache::new(store);
        let count = cache.reload().await.unwrap();
        assert_eq!(count, 3);
    }
}
