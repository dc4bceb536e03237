//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rolegate_authz::{
    AdminRoles, CachedResourceProvider, InMemoryRoleDirectory, PermissionsResolver,
    ProviderError, ResourceLoader, ResourceProvider, ResourceProviderError, StaticResourceLoader,
    UserRolesProvider,
};
use rolegate_core::{
    AnyResource, Authorization, ExternalUser, Permissions, Pipeline, Resource, ResourceType, Role,
    ServiceAccount,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn roles(names: &[&str]) -> HashSet<Role> {
    names.iter().map(|name| Role::new(*name)).collect()
}

pub fn read_by(role: &str) -> Permissions {
    Permissions::builder().add(Authorization::Read, role).build()
}

/// One unrestricted pipeline and two readable by "eng"
pub fn eng_pipelines() -> Vec<Pipeline> {
    vec![
        Pipeline::new("open", "open", "checkout"),
        Pipeline::new("eng-build", "build", "checkout").with_permissions(read_by("eng")),
        Pipeline::new("eng-deploy", "deploy", "checkout").with_permissions(read_by("eng")),
    ]
}

/// One service account reserved to "ops"
pub fn ops_service_accounts() -> Vec<ServiceAccount> {
    vec![ServiceAccount::new("ops-bot@example.com", ["ops"])]
}

pub fn static_provider<R: Resource>(
    name: &str,
    resources: Vec<R>,
) -> Arc<CachedResourceProvider<R>> {
    Arc::new(CachedResourceProvider::new(
        name,
        Arc::new(StaticResourceLoader::new(resources)),
    ))
}

/// Directory wrapper recording every call
#[derive(Default)]
pub struct RecordingDirectory {
    inner: InMemoryRoleDirectory,
    pub single_calls: AtomicUsize,
    pub multi_calls: Mutex<Vec<Vec<String>>>,
    pub fail: AtomicBool,
}

impl RecordingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unrestricted_roles(mut self, roles: &[&str]) -> Self {
        self.inner = self.inner.with_unrestricted_roles(roles.iter().copied());
        self
    }

    pub fn set_roles(&self, user_id: &str, roles: &[&str]) {
        self.inner.set_roles(user_id, roles.iter().copied());
    }

    /// Every id ever passed to `multi_load_roles`
    pub fn multi_loaded_ids(&self) -> HashSet<String> {
        self.multi_calls.lock().iter().flatten().cloned().collect()
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("directory offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRolesProvider for RecordingDirectory {
    async fn load_roles(&self, user: &ExternalUser) -> Result<Vec<Role>, ProviderError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.load_roles(user).await
    }

    async fn load_unrestricted_roles(&self) -> Result<Vec<Role>, ProviderError> {
        self.check()?;
        self.inner.load_unrestricted_roles().await
    }

    async fn multi_load_roles(
        &self,
        users: &[ExternalUser],
    ) -> Result<HashMap<String, Vec<Role>>, ProviderError> {
        self.multi_calls
            .lock()
            .push(users.iter().map(|u| u.id.clone()).collect());
        self.check()?;
        self.inner.multi_load_roles(users).await
    }
}

/// Loader whose failures can be switched on after a successful load
pub struct FlakyLoader<R> {
    resources: Vec<R>,
    pub fail: AtomicBool,
    pub loads: AtomicUsize,
}

impl<R: Resource> FlakyLoader<R> {
    pub fn new(resources: Vec<R>) -> Self {
        Self {
            resources,
            fail: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<R: Resource> ResourceLoader<R> for FlakyLoader<R> {
    async fn load_all(&self) -> Result<Vec<R>, ProviderError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Backend("upstream returned 503".into()));
        }
        Ok(self.resources.clone())
    }
}

/// Loader that parks inside `load_all` until released, once its gate is closed
pub struct GatedLoader<R> {
    resources: Mutex<Vec<R>>,
    gated: AtomicBool,
    pub fail: AtomicBool,
    /// Notified when a gated load has started
    pub started: Notify,
    pub release: Notify,
}

impl<R: Resource> GatedLoader<R> {
    pub fn new(resources: Vec<R>) -> Self {
        Self {
            resources: Mutex::new(resources),
            gated: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resources returned by the next load
    pub fn set(&self, resources: Vec<R>) {
        *self.resources.lock() = resources;
    }

    /// Park every following load until `release` is notified
    pub fn close_gate(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl<R: Resource> ResourceLoader<R> for GatedLoader<R> {
    async fn load_all(&self) -> Result<Vec<R>, ProviderError> {
        if self.gated.load(Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Backend("upstream returned 503".into()));
        }
        Ok(self.resources.lock().clone())
    }
}

/// Provider counting `clear_cache` calls and failing for chosen identities
pub struct ScriptedProvider {
    name: String,
    pub clears: AtomicUsize,
    pub fail_for: Mutex<HashSet<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            clears: AtomicUsize::new(0),
            fail_for: Mutex::new(HashSet::new()),
        }
    }

    pub fn failing_for(self, user_id: &str) -> Self {
        self.fail_for.lock().insert(user_id.to_string());
        self
    }

    fn error(&self) -> ResourceProviderError {
        ResourceProviderError::new(self.name.clone(), ProviderError::Timeout)
    }
}

#[async_trait]
impl ResourceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::Application
    }

    async fn get_all_restricted(
        &self,
        user_id: &str,
        _roles: &HashSet<Role>,
        _is_admin: bool,
    ) -> Result<Vec<AnyResource>, ResourceProviderError> {
        if self.fail_for.lock().contains(user_id) {
            return Err(self.error());
        }
        Ok(Vec::new())
    }

    async fn get_all_unrestricted(&self) -> Result<Vec<AnyResource>, ResourceProviderError> {
        Ok(Vec::new())
    }

    async fn clear_cache(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pipelines readable by "eng" plus service accounts reserved to "ops"
pub struct Fixture {
    pub directory: Arc<RecordingDirectory>,
    pub pipelines: Arc<CachedResourceProvider<Pipeline>>,
    pub service_accounts: Arc<CachedResourceProvider<ServiceAccount>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(RecordingDirectory::new()),
            pipelines: static_provider("pipelines", eng_pipelines()),
            service_accounts: static_provider("service-accounts", ops_service_accounts()),
        }
    }

    pub fn providers(&self) -> Vec<Arc<dyn ResourceProvider>> {
        vec![
            self.pipelines.clone() as Arc<dyn ResourceProvider>,
            self.service_accounts.clone() as Arc<dyn ResourceProvider>,
        ]
    }

    pub fn resolver(&self, admin: &[&str]) -> PermissionsResolver {
        self.resolver_with(admin, self.providers())
    }

    pub fn resolver_with(
        &self,
        admin: &[&str],
        providers: Vec<Arc<dyn ResourceProvider>>,
    ) -> PermissionsResolver {
        PermissionsResolver::new(
            self.directory.clone(),
            self.service_accounts.clone(),
            providers,
            AdminRoles::new(admin.iter().copied()),
        )
    }
}
