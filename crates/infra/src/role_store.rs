//! Role store: persisted role → permission-set mapping.
//!
//! The backing store is a simple collection contract; the resolver never
//! reads it directly, only through the [`RoleCache`](crate::RoleCache)
//! snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use warden_auth::permissions::catalog;
use warden_auth::{Permission, Role, RoleDefinition};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("stored record could not be decoded: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<RoleDefinition>, StoreError>;

    async fn get(&self, name: &Role) -> Result<Option<RoleDefinition>, StoreError>;

    async fn upsert(&self, def: RoleDefinition) -> Result<(), StoreError>;

    /// Returns whether the role existed.
    async fn delete(&self, name: &Role) -> Result<bool, StoreError>;
}

/// In-process role store for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<Role, RoleDefinition>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with the deployment's built-in roles: `admin` holds the
    /// wildcard, `user` starts with nothing.
    pub fn with_defaults() -> Self {
        let roles: HashMap<Role, RoleDefinition> = [
            RoleDefinition::new(Role::from_static("admin"), vec![Permission::wildcard()]),
            RoleDefinition::new(Role::from_static("user"), vec![]),
            RoleDefinition::new(
                Role::from_static("editor"),
                vec![catalog::BLOG_MANAGE, catalog::FILE_UPLOAD],
            ),
        ]
        .into_iter()
        .map(|def| (def.name.clone(), def))
        .collect();

        Self {
            roles: RwLock::new(roles),
        }
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn load_all(&self) -> Result<Vec<RoleDefinition>, StoreError> {
        let roles = self.roles.read().await;
        Ok(roles.values().cloned().collect())
    }

    async fn get(&self, name: &Role) -> Result<Option<RoleDefinition>, StoreError> {
        let roles = self.roles.read().await;
        Ok(roles.get(name).cloned())
    }

    async fn upsert(&self, def: RoleDefinition) -> Result<(), StoreError> {
        let mut roles = self.roles.write().await;
        roles.insert(def.name.clone(), def);
        Ok(())
    }

    async fn delete(&self, name: &Role) -> Result<bool, StoreError> {
        let mut roles = self.roles.write().await;
        Ok(roles.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_existing_definition() {
        let store = InMemoryRoleStore::new();
        store
            .upsert(RoleDefinition::new(Role::new("editor"), vec![catalog::BLOG_MANAGE]))
            .await
            .unwrap();
        store
            .upsert(RoleDefinition::new(Role::new("editor"), vec![catalog::FILE_UPLOAD]))
            .await
            .unwrap();

        let def = store.get(&Role::new("editor")).await.unwrap().unwrap();
        assert!(def.permissions.contains(&catalog::FILE_UPLOAD));
        assert!(!def.permissions.contains(&catalog::BLOG_MANAGE));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryRoleStore::new();
        store
            .upsert(RoleDefinition::new(Role::new("temp"), vec![]))
            .await
            .unwrap();
        assert!(store.delete(&Role::new("temp")).await.unwrap());
        assert!(!store.delete(&Role::new("temp")).await.unwrap());
    }
}
