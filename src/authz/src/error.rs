//! Error types for permission resolution

use std::fmt;
use thiserror::Error;

/// Failure reported by a collaborator (role directory, resource loader, repository backend)
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Backend could not be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time
    #[error("Backend timed out")]
    Timeout,

    /// Backend answered with an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Uncategorized failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Which role query failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleQuery {
    /// Per-identity lookup
    User(String),
    /// The unrestricted-roles query
    Unrestricted,
    /// Batched multi-load over `n` identities
    Bulk(usize),
}

impl fmt::Display for RoleQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleQuery::User(id) => write!(f, "user '{}'", id),
            RoleQuery::Unrestricted => write!(f, "unrestricted roles"),
            RoleQuery::Bulk(n) => write!(f, "bulk load of {} users", n),
        }
    }
}

/// The role directory failed to answer a role query
#[derive(Debug, Error)]
#[error("Role directory failed for {target}")]
pub struct RoleDirectoryError {
    /// Query that failed
    pub target: RoleQuery,
    #[source]
    pub source: ProviderError,
}

/// A resource provider query or refresh failed
#[derive(Debug, Error)]
#[error("Resource provider '{provider}' failed")]
pub struct ResourceProviderError {
    /// Provider name
    pub provider: String,
    #[source]
    pub source: ProviderError,
}

impl ResourceProviderError {
    pub fn new(provider: impl Into<String>, source: ProviderError) -> Self {
        Self {
            provider: provider.into(),
            source,
        }
    }
}

/// Failure surfaced to callers of the resolver. No partial permission set
/// accompanies it.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Roles could not be loaded
    #[error("Failed to resolve permissions for '{user_id}': {source}")]
    RoleDirectory {
        user_id: String,
        #[source]
        source: RoleDirectoryError,
    },

    /// Resources could not be aggregated
    #[error("Failed to resolve permissions for '{user_id}': {source}")]
    ResourceProvider {
        user_id: String,
        #[source]
        source: ResourceProviderError,
    },
}

impl ResolutionError {
    /// Identity the failed resolution targeted ("bulk" for batch-wide failures)
    pub fn user_id(&self) -> &str {
        match self {
            ResolutionError::RoleDirectory { user_id, .. } => user_id,
            ResolutionError::ResourceProvider { user_id, .. } => user_id,
        }
    }

    /// Name of the failing provider, if a provider failed
    pub fn provider(&self) -> Option<&str> {
        match self {
            ResolutionError::ResourceProvider { source, .. } => Some(&source.provider),
            ResolutionError::RoleDirectory { .. } => None,
        }
    }
}

/// Permissions repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, ResolutionError>;
