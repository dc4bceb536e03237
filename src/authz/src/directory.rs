//! Role directory contract
//!
//! The directory answers "which roles does this identity hold". Backends
//! (LDAP, OAuth group sync, static files) implement [`UserRolesProvider`];
//! the resolver only consumes it.

use crate::error::ProviderError;
use async_trait::async_trait;
use dashmap::DashMap;
use rolegate_core::{ExternalUser, Role, RoleSource};
use std::collections::HashMap;

/// Role directory collaborator
#[async_trait]
pub trait UserRolesProvider: Send + Sync {
    /// Roles held by one identity
    async fn load_roles(&self, user: &ExternalUser) -> Result<Vec<Role>, ProviderError>;

    /// Roles granted to the anonymous/unrestricted identity
    async fn load_unrestricted_roles(&self) -> Result<Vec<Role>, ProviderError>;

    /// Roles for many identities in one call, keyed by identity id.
    ///
    /// Backends with a batch API should override this; the default issues one
    /// `load_roles` per identity.
    async fn multi_load_roles(
        &self,
        users: &[ExternalUser],
    ) -> Result<HashMap<String, Vec<Role>>, ProviderError> {
        let mut roles = HashMap::with_capacity(users.len());
        for user in users {
            roles.insert(user.id.clone(), self.load_roles(user).await?);
        }
        Ok(roles)
    }
}

/// Directory backed by a fixed user → role-names table, e.g. loaded from a
/// roles file at startup.
#[derive(Debug, Default)]
pub struct InMemoryRoleDirectory {
    users: DashMap<String, Vec<String>>,
    unrestricted: Vec<String>,
}

impl InMemoryRoleDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles handed to the unrestricted identity
    pub fn with_unrestricted_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unrestricted = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the roles of one user
    pub fn set_roles<I, S>(&self, user_id: impl Into<String>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users
            .insert(user_id.into(), roles.into_iter().map(Into::into).collect());
    }

    /// Forget a user
    pub fn remove(&self, user_id: &str) {
        self.users.remove(user_id);
    }

    fn to_roles(names: &[String]) -> Vec<Role> {
        names
            .iter()
            .map(|name| Role::new(name.as_str()).with_source(RoleSource::File))
            .collect()
    }
}

#[async_trait]
impl UserRolesProvider for InMemoryRoleDirectory {
    async fn load_roles(&self, user: &ExternalUser) -> Result<Vec<Role>, ProviderError> {
        Ok(self
            .users
            .get(&user.id)
            .map(|entry| Self::to_roles(entry.value()))
            .unwrap_or_default())
    }

    async fn load_unrestricted_roles(&self) -> Result<Vec<Role>, ProviderError> {
        Ok(Self::to_roles(&self.unrestricted))
    }

    async fn multi_load_roles(
        &self,
        users: &[ExternalUser],
    ) -> Result<HashMap<String, Vec<Role>>, ProviderError> {
        Ok(users
            .iter()
            .filter_map(|user| {
                self.users
                    .get(&user.id)
                    .map(|entry| (user.id.clone(), Self::to_roles(entry.value())))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_directory_lookup() {
        let directory = InMemoryRoleDirectory::new().with_unrestricted_roles(["anonymous"]);
        directory.set_roles("alice", ["eng", "ops"]);

        let roles = directory.load_roles(&ExternalUser::new("alice")).await.unwrap();
        assert_eq!(roles.len(), 2);
        assert!(roles.iter().all(|r| r.source == Some(RoleSource::File)));

        let missing = directory.load_roles(&ExternalUser::new("bob")).await.unwrap();
        assert!(missing.is_empty());

        let unrestricted = directory.load_unrestricted_roles().await.unwrap();
        assert_eq!(unrestricted, vec![Role::new("anonymous")]);
    }

    #[tokio::test]
    async fn test_multi_load_omits_unknown_users() {
        let directory = InMemoryRoleDirectory::new();
        directory.set_roles("alice", ["eng"]);

        let users = vec![ExternalUser::new("alice"), ExternalUser::new("bob")];
        let roles = directory.multi_load_roles(&users).await.unwrap();

        assert_eq!(roles.len(), 1);
        assert_eq!(roles["alice"], vec![Role::new("eng")]);
    }

    struct SingleLookupDirectory;

    #[async_trait]
    impl UserRolesProvider for SingleLookupDirectory {
        async fn load_roles(&self, user: &ExternalUser) -> Result<Vec<Role>, ProviderError> {
            Ok(vec![Role::new(format!("{}-role", user.id))])
        }

        async fn load_unrestricted_roles(&self) -> Result<Vec<Role>, ProviderError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_default_multi_load_loops_single_lookups() {
        let users = vec![ExternalUser::new("a"), ExternalUser::new("b")];
        let roles = SingleLookupDirectory.multi_load_roles(&users).await.unwrap();

        assert_eq!(roles["a"], vec![Role::new("a-role")]);
        assert_eq!(roles["b"], vec![Role::new("b-role")]);
    }
}
