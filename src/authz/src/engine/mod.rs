//! Permission resolution engine
//!
//! Combines the role directory, the admin role set and every registered
//! resource provider into a [`UserPermission`] per identity.

pub mod metrics;

pub use metrics::{EngineMetrics, FailureKind, MetricsCollector};

use crate::config::{AdminRoles, ResolverSettings};
use crate::directory::UserRolesProvider;
use crate::error::{
    ResolutionError, ResourceProviderError, Result, RoleDirectoryError, RoleQuery,
};
use crate::providers::{ResourceProvider, ServiceAccountProvider};
use futures::future::join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use rolegate_core::{is_unrestricted_user, ExternalUser, Role, UserPermission, UNRESTRICTED_USERNAME};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Target reported for failures that are not tied to one identity
pub const BULK_TARGET: &str = "bulk";

/// Resolves identities to roles, admin status and visible resources.
///
/// # Architecture
///
/// ```text
/// ExternalUser → UserRolesProvider → roles ∪ external roles → AdminRoles
///                                                  ↓
///                        ResourceProvider × N (cached snapshots)
///                                                  ↓
///                                           UserPermission
/// ```
///
/// Holds no mutable state of its own; share it behind an `Arc`.
///
/// Resolution is all-or-nothing per identity: any directory or provider
/// failure aborts with a [`ResolutionError`] instead of returning a partial
/// permission set. Bulk resolution is fail-fast: the first identity that
/// fails aborts the batch and the error names that identity.
pub struct PermissionsResolver {
    /// Role directory
    user_roles_provider: Arc<dyn UserRolesProvider>,

    /// Service accounts, consulted to route them around the directory
    service_account_provider: Arc<dyn ServiceAccountProvider>,

    /// Registered providers, queried in registration order
    resource_providers: Vec<Arc<dyn ResourceProvider>>,

    /// Admin role names
    admin_roles: AdminRoles,

    settings: ResolverSettings,

    metrics: Option<Arc<MetricsCollector>>,
}

impl PermissionsResolver {
    /// Create a resolver over its collaborators
    pub fn new(
        user_roles_provider: Arc<dyn UserRolesProvider>,
        service_account_provider: Arc<dyn ServiceAccountProvider>,
        resource_providers: Vec<Arc<dyn ResourceProvider>>,
        admin_roles: AdminRoles,
    ) -> Self {
        info!(
            "PermissionsResolver initialized with {} resource providers",
            resource_providers.len()
        );

        Self {
            user_roles_provider,
            service_account_provider,
            resource_providers,
            admin_roles,
            settings: ResolverSettings::default(),
            metrics: None,
        }
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Enable metrics collection
    pub fn with_metrics(mut self) -> Self {
        self.metrics = Some(Arc::new(MetricsCollector::new()));
        self
    }

    /// Registered providers
    pub fn resource_providers(&self) -> &[Arc<dyn ResourceProvider>] {
        &self.resource_providers
    }

    /// Current metrics, if enabled
    pub async fn get_metrics(&self) -> Option<EngineMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.get_metrics().await),
            None => None,
        }
    }

    /// Permissions of the anonymous/unrestricted identity: the directory's
    /// unrestricted roles and every provider's unrestricted resources.
    pub async fn resolve_unrestricted_user(&self) -> Result<UserPermission> {
        let start = Instant::now();
        let result = self.resolve_unrestricted_user_inner().await;
        self.observe_single(UNRESTRICTED_USERNAME, result, start).await
    }

    /// Resolve an identity with no caller-supplied roles
    pub async fn resolve(&self, user_id: &str) -> Result<UserPermission> {
        self.resolve_and_merge(&ExternalUser::new(user_id)).await
    }

    /// Resolve an identity, merging directory roles with `user.external_roles`
    pub async fn resolve_and_merge(&self, user: &ExternalUser) -> Result<UserPermission> {
        let start = Instant::now();
        let result = self.resolve_and_merge_inner(user).await;
        self.observe_single(&user.id, result, start).await
    }

    /// Resolve many identities with a single directory round trip.
    ///
    /// Identities matching a known service account keep exactly their
    /// external roles and are never sent to the directory. Everyone else is
    /// loaded through one `multi_load_roles` call and merged with their
    /// external roles. Resources are restricted-only.
    pub async fn resolve_all(
        &self,
        users: Vec<ExternalUser>,
    ) -> Result<HashMap<String, UserPermission>> {
        let start = Instant::now();
        let result = self.resolve_all_inner(users).await;

        match &result {
            Ok(resolved) => {
                info!(
                    "Resolved {} identities in {:?}",
                    resolved.len(),
                    start.elapsed()
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_bulk(resolved.len(), start.elapsed()).await;
                }
            }
            Err(e) => self.record_failure(e).await,
        }

        result
    }

    /// Signal every provider to drop its cache
    pub async fn clear_cache(&self) {
        join_all(self.resource_providers.iter().map(|p| p.clear_cache())).await;
        info!("Cleared {} provider caches", self.resource_providers.len());
    }

    // Private helper methods

    async fn resolve_unrestricted_user_inner(&self) -> Result<UserPermission> {
        let roles = self
            .user_roles_provider
            .load_unrestricted_roles()
            .await
            .map_err(|source| ResolutionError::RoleDirectory {
                user_id: UNRESTRICTED_USERNAME.to_string(),
                source: RoleDirectoryError {
                    target: RoleQuery::Unrestricted,
                    source,
                },
            })?;

        let roles: HashSet<Role> = roles.into_iter().collect();
        let admin = self.admin_roles.is_admin(&roles);
        let mut permission = UserPermission::new(UNRESTRICTED_USERNAME)
            .with_roles(roles)
            .with_admin(admin);

        for provider in &self.resource_providers {
            let resources = provider
                .get_all_unrestricted()
                .await
                .map_err(|source| Self::provider_failure(UNRESTRICTED_USERNAME, source))?;
            permission.add_resources(resources);
        }

        Ok(permission)
    }

    async fn resolve_and_merge_inner(&self, user: &ExternalUser) -> Result<UserPermission> {
        debug!(user = %user.id, "Loading roles");
        let roles = self
            .user_roles_provider
            .load_roles(user)
            .await
            .map_err(|source| ResolutionError::RoleDirectory {
                user_id: user.id.clone(),
                source: RoleDirectoryError {
                    target: RoleQuery::User(user.id.clone()),
                    source,
                },
            })?;
        debug!(user = %user.id, ?roles, "Got roles");

        let merged: HashSet<Role> = roles
            .into_iter()
            .chain(user.external_roles.iter().cloned())
            .collect();

        let include_unrestricted = is_unrestricted_user(&user.id);
        self.aggregate(user.id.clone(), merged, include_unrestricted)
            .await
    }

    async fn resolve_all_inner(
        &self,
        users: Vec<ExternalUser>,
    ) -> Result<HashMap<String, UserPermission>> {
        let phase = Instant::now();
        let service_accounts: HashSet<String> = self
            .service_account_provider
            .get_all_service_accounts()
            .await
            .map_err(|source| Self::provider_failure(BULK_TARGET, source))?
            .into_iter()
            .map(|account| account.to_user_permission().id)
            .collect();
        info!(
            "Loaded {} service accounts in {:?}",
            service_accounts.len(),
            phase.elapsed()
        );

        // Service accounts already carry their final roles
        let (service_users, directory_users): (Vec<_>, Vec<_>) = users
            .into_iter()
            .partition(|user| service_accounts.contains(&user.id));

        let mut user_roles: HashMap<String, HashSet<Role>> = HashMap::new();

        if !directory_users.is_empty() {
            let phase = Instant::now();
            let loaded = self
                .user_roles_provider
                .multi_load_roles(&directory_users)
                .await
                .map_err(|source| ResolutionError::RoleDirectory {
                    user_id: BULK_TARGET.to_string(),
                    source: RoleDirectoryError {
                        target: RoleQuery::Bulk(directory_users.len()),
                        source,
                    },
                })?;

            for (user_id, roles) in loaded {
                user_roles.entry(user_id).or_default().extend(roles);
            }
            for user in &directory_users {
                user_roles
                    .entry(user.id.clone())
                    .or_default()
                    .extend(user.external_roles.iter().cloned());
            }

            info!(
                "Multi-loaded roles for {} users in {:?}",
                directory_users.len(),
                phase.elapsed()
            );
            debug!(?user_roles, "Multi-loaded roles");
        }

        for user in service_users {
            user_roles.insert(user.id, user.external_roles.into_iter().collect());
        }

        let phase = Instant::now();
        let count = user_roles.len();
        let resolved: Vec<UserPermission> = stream::iter(user_roles)
            .map(|(user_id, roles)| self.aggregate(user_id, roles, false))
            .buffer_unordered(self.settings.bulk_concurrency.max(1))
            .try_collect()
            .await?;
        info!("Built {} permissions in {:?}", count, phase.elapsed());

        Ok(resolved
            .into_iter()
            .map(|permission| (permission.id.clone(), permission))
            .collect())
    }

    /// Admin flag plus resources from every provider
    async fn aggregate(
        &self,
        user_id: String,
        roles: HashSet<Role>,
        include_unrestricted: bool,
    ) -> Result<UserPermission> {
        let admin = self.admin_roles.is_admin(&roles);
        let mut permission = UserPermission::new(user_id.as_str())
            .with_roles(roles)
            .with_admin(admin);

        for provider in &self.resource_providers {
            if include_unrestricted {
                let resources = provider
                    .get_all_unrestricted()
                    .await
                    .map_err(|source| Self::provider_failure(&user_id, source))?;
                permission.add_resources(resources);
            }

            if !permission.roles.is_empty() {
                let resources = provider
                    .get_all_restricted(&user_id, &permission.roles, admin)
                    .await
                    .map_err(|source| Self::provider_failure(&user_id, source))?;
                permission.add_resources(resources);
            }
        }

        debug!(
            user = %user_id,
            admin,
            "Resolved {} roles and {} resources",
            permission.roles.len(),
            permission.resource_count()
        );
        Ok(permission)
    }

    fn provider_failure(user_id: &str, source: ResourceProviderError) -> ResolutionError {
        ResolutionError::ResourceProvider {
            user_id: user_id.to_string(),
            source,
        }
    }

    async fn observe_single(
        &self,
        user_id: &str,
        result: Result<UserPermission>,
        start: Instant,
    ) -> Result<UserPermission> {
        match &result {
            Ok(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_single(start.elapsed()).await;
                }
            }
            Err(e) => {
                debug!(user = user_id, "Resolution aborted");
                self.record_failure(e).await;
            }
        }
        result
    }

    async fn record_failure(&self, error: &ResolutionError) {
        warn!(user = error.user_id(), error = %error, "Permission resolution failed");

        if let Some(metrics) = &self.metrics {
            let kind = match error {
                ResolutionError::RoleDirectory { .. } => FailureKind::RoleDirectory,
                ResolutionError::ResourceProvider { .. } => FailureKind::ResourceProvider,
            };
            metrics.record_failure(kind).await;
        }
    }
}
