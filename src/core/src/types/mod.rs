//! Shared data model for permission resolution

pub mod permissions;
pub mod resource;
pub mod role;
pub mod user;

// Re-export commonly used types
pub use permissions::{Authorization, Permissions, PermissionsBuilder};
pub use resource::{
    Account, AnyResource, Application, BuildService, Pipeline, Resource, ResourceKey,
    ResourceType, ServiceAccount,
};
pub use role::{Role, RoleSource};
pub use user::{is_unrestricted_user, ExternalUser, UserPermission, UNRESTRICTED_USERNAME};
