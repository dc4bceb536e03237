//! Resource providers
//!
//! One provider per resource variant, each owning a cached snapshot of that
//! variant. The resolver sees providers only through [`ResourceProvider`],
//! registered as a list of trait objects.
//!
//! # Example
//!
//! ```rust
//! use rolegate_authz::fallback::AuthorizationFallback;
//! use rolegate_authz::providers::{CachedResourceProvider, StaticResourceLoader};
//! use rolegate_core::{Authorization, Permissions, Pipeline};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = StaticResourceLoader::new(vec![
//!     Pipeline::new("p-1", "deploy", "checkout")
//!         .with_permissions(Permissions::builder().add(Authorization::Read, "eng").build()),
//! ]);
//!
//! let pipelines = CachedResourceProvider::<Pipeline>::new("pipelines", Arc::new(loader))
//!     .with_fallback(Arc::new(AuthorizationFallback::execute_from_read()));
//!
//! // Normally driven by a scheduler
//! pipelines.refresh().await?;
//! # Ok(())
//! # }
//! ```

pub mod cached;
pub mod loader;
pub mod permission_source;

pub use cached::{CachedResourceProvider, ProviderStats, Snapshot};
pub use loader::{ResourceLoader, StaticResourceLoader};
pub use permission_source::{
    ApplicationPermissionSource, DeclaredPermissionSource, ResourcePermissionSource,
};

use crate::error::ResourceProviderError;
use async_trait::async_trait;
use rolegate_core::{AnyResource, ResourceType, Role, ServiceAccount};
use std::collections::HashSet;

/// Capability set the resolver depends on
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Variant this provider serves
    fn resource_type(&self) -> ResourceType;

    /// Resources visible to `user_id` holding `roles`: everything when
    /// `is_admin`, otherwise unrestricted resources plus those granting any
    /// access level to one of `roles`.
    async fn get_all_restricted(
        &self,
        user_id: &str,
        roles: &HashSet<Role>,
        is_admin: bool,
    ) -> Result<Vec<AnyResource>, ResourceProviderError>;

    /// Resources declaring no access rule
    async fn get_all_unrestricted(&self) -> Result<Vec<AnyResource>, ResourceProviderError>;

    /// Drop cached state
    async fn clear_cache(&self);
}

/// Provider of service accounts; the resolver reads the full list to route
/// service-account identities around the role directory.
#[async_trait]
pub trait ServiceAccountProvider: ResourceProvider {
    async fn get_all_service_accounts(&self) -> Result<Vec<ServiceAccount>, ResourceProviderError>;
}
