//! Role types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Where a role grant came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleSource {
    /// Loaded from the external role directory
    Directory,
    /// Supplied by the caller alongside the identity
    External,
    /// Loaded from a static role file
    File,
    /// Membership of a service account
    ServiceAccount,
}

/// A named grant unit held by an identity.
///
/// Two roles are the same role when their names match; the source is
/// informational and does not take part in equality, ordering or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Role name (case-sensitive)
    pub name: String,

    /// Origin of the grant, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RoleSource>,
}

impl Role {
    /// Create a role with no recorded source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    /// Set the role source
    pub fn with_source(mut self, source: RoleSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Get the role name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Role {}

impl Hash for Role {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::new(name)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Role::new(name)
    }
}
