//! Snapshot cache over one resource variant
//!
//! Readers grab the current `Arc<Snapshot>` and filter it without holding any
//! lock; a refresh builds the next snapshot off to the side and swaps the
//! pointer in a single write. Readers therefore see either the old or the new
//! snapshot, never a mix.

use super::loader::ResourceLoader;
use super::permission_source::{DeclaredPermissionSource, ResourcePermissionSource};
use super::{ResourceProvider, ServiceAccountProvider};
use crate::config::ProviderCacheSettings;
use crate::error::ResourceProviderError;
use crate::fallback::FallbackPermissionsResolver;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rolegate_core::{AnyResource, Resource, ResourceType, Role, ServiceAccount};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Immutable view of every resource a provider knew at one point in time
#[derive(Debug)]
pub struct Snapshot<R> {
    resources: Vec<R>,
    /// Resource name to position in `resources` (first occurrence wins)
    index: HashMap<String, usize>,
    generation: u64,
    loaded_at: DateTime<Utc>,
}

impl<R: Resource> Snapshot<R> {
    fn new(resources: Vec<R>, generation: u64) -> Self {
        let mut index = HashMap::with_capacity(resources.len());
        for (position, resource) in resources.iter().enumerate() {
            index.entry(resource.name().to_string()).or_insert(position);
        }

        Self {
            resources,
            index,
            generation,
            loaded_at: Utc::now(),
        }
    }

    /// Monotonic refresh counter of the owning provider
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the snapshot was built
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.resources.iter()
    }

    /// Resource named `name`
    pub fn get(&self, name: &str) -> Option<&R> {
        self.index.get(name).map(|&position| &self.resources[position])
    }

    /// Resources declaring no access rule
    pub fn unrestricted(&self) -> impl Iterator<Item = &R> {
        self.resources
            .iter()
            .filter(|resource| !resource.permissions().is_restricted())
    }

    /// Resources visible to an identity holding `roles`
    pub fn restricted<'a>(
        &'a self,
        roles: &'a HashSet<Role>,
        is_admin: bool,
    ) -> impl Iterator<Item = &'a R> + 'a {
        self.resources.iter().filter(move |resource| {
            if is_admin {
                return true;
            }
            let permissions = resource.permissions();
            !permissions.is_restricted() || permissions.is_authorized(roles)
        })
    }
}

/// Provider counters
#[derive(Debug, Clone)]
pub struct ProviderStats {
    pub name: String,
    /// Generation of the snapshot being served (0 = none loaded yet)
    pub generation: u64,
    /// Resources in the snapshot being served
    pub resources: usize,
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub last_loaded_at: Option<DateTime<Utc>>,
}

/// Cached resource provider for one resource variant.
///
/// # Thread Safety
///
/// Shared across tasks through `Arc`. Queries run concurrently with each
/// other and with a refresh; refreshes of the same provider are serialized.
pub struct CachedResourceProvider<R: Resource> {
    name: String,

    /// Backing service
    loader: Arc<dyn ResourceLoader<R>>,

    /// Declared permissions of loaded resources
    permission_source: Arc<dyn ResourcePermissionSource<R>>,

    /// Completes permissions left unset
    fallback: Option<Arc<dyn FallbackPermissionsResolver>>,

    settings: ProviderCacheSettings,

    /// Current snapshot; the lock only guards the pointer swap
    snapshot: RwLock<Option<Arc<Snapshot<R>>>>,

    /// Serializes refreshes
    refresh_lock: Mutex<()>,

    generation: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

impl<R: Resource> CachedResourceProvider<R> {
    /// Create a provider over `loader` with declared permissions and no fallback
    pub fn new(name: impl Into<String>, loader: Arc<dyn ResourceLoader<R>>) -> Self {
        Self {
            name: name.into(),
            loader,
            permission_source: Arc::new(DeclaredPermissionSource),
            fallback: None,
            settings: ProviderCacheSettings::default(),
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
        }
    }

    pub fn with_permission_source(mut self, source: Arc<dyn ResourcePermissionSource<R>>) -> Self {
        self.permission_source = source;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackPermissionsResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_settings(mut self, settings: ProviderCacheSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Provider name used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot currently served, if any
    pub fn current(&self) -> Option<Arc<Snapshot<R>>> {
        self.snapshot.read().clone()
    }

    /// Reload from the backing service and swap the snapshot.
    ///
    /// On failure the previous snapshot keeps serving and the error is
    /// returned here only. Returns the number of resources loaded.
    pub async fn refresh(&self) -> Result<usize, ResourceProviderError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Drop the snapshot
    pub fn clear(&self) {
        *self.snapshot.write() = None;
        debug!(provider = %self.name, "Snapshot cleared");
    }

    /// Resources visible to an identity
    pub async fn restricted(
        &self,
        user_id: &str,
        roles: &HashSet<Role>,
        is_admin: bool,
    ) -> Result<Vec<R>, ResourceProviderError> {
        let Some(snapshot) = self.snapshot_for_query().await? else {
            return Ok(Vec::new());
        };

        let visible: Vec<R> = snapshot.restricted(roles, is_admin).cloned().collect();
        debug!(
            provider = %self.name,
            user = user_id,
            admin = is_admin,
            "{} of {} resources visible",
            visible.len(),
            snapshot.len()
        );
        Ok(visible)
    }

    /// Resources declaring no access rule
    pub async fn unrestricted(&self) -> Result<Vec<R>, ResourceProviderError> {
        Ok(self
            .snapshot_for_query()
            .await?
            .map(|snapshot| snapshot.unrestricted().cloned().collect())
            .unwrap_or_default())
    }

    /// Every resource in the current snapshot
    pub async fn all(&self) -> Result<Vec<R>, ResourceProviderError> {
        Ok(self
            .snapshot_for_query()
            .await?
            .map(|snapshot| snapshot.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Current counters
    pub fn stats(&self) -> ProviderStats {
        let snapshot = self.current();
        ProviderStats {
            name: self.name.clone(),
            generation: snapshot.as_ref().map(|s| s.generation()).unwrap_or(0),
            resources: snapshot.as_ref().map(|s| s.len()).unwrap_or(0),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            last_loaded_at: snapshot.map(|s| s.loaded_at()),
        }
    }

    async fn snapshot_for_query(&self) -> Result<Option<Arc<Snapshot<R>>>, ResourceProviderError> {
        if let Some(snapshot) = self.current() {
            return Ok(Some(snapshot));
        }

        if !self.settings.load_on_demand {
            return Ok(None);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have loaded while we waited
        if let Some(snapshot) = self.current() {
            return Ok(Some(snapshot));
        }

        debug!(provider = %self.name, "No snapshot, loading on demand");
        self.refresh_locked().await?;
        Ok(self.current())
    }

    async fn refresh_locked(&self) -> Result<usize, ResourceProviderError> {
        let start = Instant::now();

        let loaded = match self.loader.load_all().await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    provider = %self.name,
                    error = %e,
                    "Refresh failed, keeping previous snapshot"
                );
                return Err(ResourceProviderError::new(self.name.clone(), e));
            }
        };

        let resources: Vec<R> = loaded
            .into_iter()
            .map(|mut resource| {
                let permissions = self.resolve_permissions(&resource);
                resource.set_permissions(permissions);
                resource
            })
            .collect();
        let count = resources.len();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(Snapshot::new(resources, generation));
        *self.snapshot.write() = Some(snapshot);
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        info!(
            provider = %self.name,
            generation,
            "Loaded {} resources in {:?}",
            count,
            start.elapsed()
        );
        Ok(count)
    }

    fn resolve_permissions(&self, resource: &R) -> rolegate_core::Permissions {
        let declared = self.permission_source.permissions(resource);
        match &self.fallback {
            Some(fallback) if fallback.should_resolve(&declared) => fallback.resolve(&declared),
            _ => declared,
        }
    }
}

#[async_trait]
impl<R> ResourceProvider for CachedResourceProvider<R>
where
    R: Resource,
    AnyResource: From<R>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_type(&self) -> ResourceType {
        R::TYPE
    }

    async fn get_all_restricted(
        &self,
        user_id: &str,
        roles: &HashSet<Role>,
        is_admin: bool,
    ) -> Result<Vec<AnyResource>, ResourceProviderError> {
        Ok(self
            .restricted(user_id, roles, is_admin)
            .await?
            .into_iter()
            .map(AnyResource::from)
            .collect())
    }

    async fn get_all_unrestricted(&self) -> Result<Vec<AnyResource>, ResourceProviderError> {
        Ok(self
            .unrestricted()
            .await?
            .into_iter()
            .map(AnyResource::from)
            .collect())
    }

    async fn clear_cache(&self) {
        self.clear();
    }
}

#[async_trait]
impl ServiceAccountProvider for CachedResourceProvider<ServiceAccount> {
    async fn get_all_service_accounts(&self) -> Result<Vec<ServiceAccount>, ResourceProviderError> {
        self.all().await
    }
}
