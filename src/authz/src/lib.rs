//! # Rolegate Permission Resolution Engine
//!
//! Resolves an identity to its full permission set: the roles it holds, its
//! admin status and every resource it may access.
//!
//! ## Features
//!
//! - **Pluggable role directory** behind [`UserRolesProvider`]
//! - **Snapshot caches** per resource variant, refreshed off the query path
//! - **Bulk resolution** with one directory round trip and bounded fan-out
//! - **Fallback permissions** completing unset access levels at refresh time
//! - **TOML configuration** with environment overrides
//!
//! ## Example
//!
//! ```rust
//! use rolegate_authz::{
//!     AdminRoles, CachedResourceProvider, InMemoryRoleDirectory, PermissionsResolver,
//!     ResourceProvider, StaticResourceLoader,
//! };
//! use rolegate_core::{Application, Authorization, Permissions, ServiceAccount};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let directory = Arc::new(InMemoryRoleDirectory::new());
//!     directory.set_roles("alice", ["eng"]);
//!
//!     let applications = Arc::new(CachedResourceProvider::<Application>::new(
//!         "applications",
//!         Arc::new(StaticResourceLoader::new(vec![
//!             Application::new("checkout")
//!                 .with_permissions(Permissions::builder().add(Authorization::Read, "eng").build()),
//!         ])),
//!     ));
//!     let service_accounts = Arc::new(CachedResourceProvider::<ServiceAccount>::new(
//!         "service-accounts",
//!         Arc::new(StaticResourceLoader::<ServiceAccount>::default()),
//!     ));
//!
//!     let providers: Vec<Arc<dyn ResourceProvider>> = vec![
//!         applications as Arc<dyn ResourceProvider>,
//!         service_accounts.clone() as Arc<dyn ResourceProvider>,
//!     ];
//!     let resolver = PermissionsResolver::new(
//!         directory,
//!         service_accounts,
//!         providers,
//!         AdminRoles::new(["admin"]),
//!     );
//!
//!     let alice = resolver.resolve("alice").await?;
//!     assert_eq!(alice.resource_count(), 1);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod providers;
pub mod repository;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AdminRoles, ProviderCacheSettings, ResolverSettings, RolegateConfig};
pub use directory::{InMemoryRoleDirectory, UserRolesProvider};
pub use engine::{EngineMetrics, PermissionsResolver};
pub use error::{
    ProviderError, RepositoryError, ResolutionError, ResourceProviderError, Result,
    RoleDirectoryError, RoleQuery,
};
pub use fallback::{AuthorizationFallback, FallbackPermissionsResolver};
pub use providers::{
    CachedResourceProvider, ResourceLoader, ResourceProvider, ServiceAccountProvider,
    StaticResourceLoader,
};
pub use repository::{InMemoryPermissionsRepository, PermissionsRepository};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
