//! Storage of resolved permissions

use crate::error::RepositoryError;
use async_trait::async_trait;
use dashmap::DashMap;
use rolegate_core::{is_unrestricted_user, Role, UserPermission};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Permissions repository trait
#[async_trait]
pub trait PermissionsRepository: Send + Sync {
    /// Store one identity's permissions, replacing any previous entry
    async fn put(&self, permission: UserPermission) -> RepositoryResult<()>;

    /// Replace the whole repository with `permissions`
    async fn put_all_by_id(&self, permissions: HashMap<String, UserPermission>) -> RepositoryResult<()>;

    /// Permissions of one identity
    async fn get(&self, id: &str) -> RepositoryResult<Option<UserPermission>>;

    /// Role sets of every stored identity
    async fn get_all_by_id(&self) -> RepositoryResult<HashMap<String, HashSet<Role>>>;

    /// Role sets of stored identities, filtered by role.
    ///
    /// `None` returns everyone. `Some(&[])` returns only the unrestricted
    /// identity. Otherwise returns identities holding any of `roles`, plus
    /// the unrestricted identity.
    async fn get_all_by_roles(
        &self,
        roles: Option<&[String]>,
    ) -> RepositoryResult<HashMap<String, HashSet<Role>>>;

    /// Forget one identity
    async fn remove(&self, id: &str) -> RepositoryResult<()>;
}

/// In-memory permissions repository
#[derive(Debug, Default)]
pub struct InMemoryPermissionsRepository {
    permissions: DashMap<String, UserPermission>,
}

impl InMemoryPermissionsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

#[async_trait]
impl PermissionsRepository for InMemoryPermissionsRepository {
    async fn put(&self, permission: UserPermission) -> RepositoryResult<()> {
        self.permissions.insert(permission.id.clone(), permission);
        Ok(())
    }

    async fn put_all_by_id(&self, permissions: HashMap<String, UserPermission>) -> RepositoryResult<()> {
        self.permissions.retain(|id, _| permissions.contains_key(id));
        let count = permissions.len();
        for (id, permission) in permissions {
            self.permissions.insert(id, permission);
        }
        debug!("Stored permissions for {} identities", count);
        Ok(())
    }

    async fn get(&self, id: &str) -> RepositoryResult<Option<UserPermission>> {
        Ok(self.permissions.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_all_by_id(&self) -> RepositoryResult<HashMap<String, HashSet<Role>>> {
        Ok(self
            .permissions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().roles.clone()))
            .collect())
    }

    async fn get_all_by_roles(
        &self,
        roles: Option<&[String]>,
    ) -> RepositoryResult<HashMap<String, HashSet<Role>>> {
        let matches = |permission: &UserPermission| match roles {
            None => true,
            Some(_) if is_unrestricted_user(&permission.id) => true,
            Some(wanted) => permission
                .roles
                .iter()
                .any(|role| wanted.iter().any(|name| name == role.name())),
        };

        Ok(self
            .permissions
            .iter()
            .filter(|entry| matches(entry.value()))
            .map(|entry| (entry.key().clone(), entry.value().roles.clone()))
            .collect())
    }

    async fn remove(&self, id: &str) -> RepositoryResult<()> {
        self.permissions.remove(id);
        Ok(())
    }
}
