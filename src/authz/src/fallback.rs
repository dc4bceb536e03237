//! Fallback permissions for resources that leave an access level unset
//!
//! Applied once per resource while a provider refreshes, never at query time.

use rolegate_core::{Authorization, Permissions};

/// Decides whether declared permissions are incomplete and completes them
pub trait FallbackPermissionsResolver: Send + Sync {
    /// Whether `permissions` should be completed
    fn should_resolve(&self, permissions: &Permissions) -> bool;

    /// Completed permissions
    fn resolve(&self, permissions: &Permissions) -> Permissions;
}

/// Fills an unset access level with the roles of another level.
///
/// Unrestricted resources are left alone: they grant everything already.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationFallback {
    /// Level that gets filled
    pub fallback_to: Authorization,
    /// Level whose roles are copied
    pub fallback_from: Authorization,
}

impl AuthorizationFallback {
    pub fn new(fallback_to: Authorization, fallback_from: Authorization) -> Self {
        Self {
            fallback_to,
            fallback_from,
        }
    }

    /// Readers may execute when no execute rule is declared
    pub fn execute_from_read() -> Self {
        Self::new(Authorization::Execute, Authorization::Read)
    }
}

impl FallbackPermissionsResolver for AuthorizationFallback {
    fn should_resolve(&self, permissions: &Permissions) -> bool {
        permissions.is_restricted() && !permissions.has(self.fallback_to)
    }

    fn resolve(&self, permissions: &Permissions) -> Permissions {
        permissions.with(self.fallback_to, permissions.get(self.fallback_from))
    }
}
