//! # Rolegate Core
//!
//! Shared data model for the Rolegate permission resolution engine: roles,
//! per-resource access rules, resource variants and resolved identities.
//! Kept separate so storage and transport collaborators can depend on the
//! model without pulling in the engine.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    is_unrestricted_user, Account, AnyResource, Application, Authorization, BuildService,
    ExternalUser, Permissions, Pipeline, Resource, ResourceKey, ResourceType, Role, RoleSource,
    ServiceAccount, UserPermission, UNRESTRICTED_USERNAME,
};

/// Identity identifier (user id or service account name)
pub type UserId = String;
