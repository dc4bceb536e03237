//! Per-resource access rules

use crate::error::CoreError;
use crate::types::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Access level granted on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Authorization {
    /// View the resource
    Read,
    /// Modify the resource
    Write,
    /// Run or trigger the resource
    Execute,
    /// Create children of the resource
    Create,
}

impl Authorization {
    /// Every access level
    pub const ALL: [Authorization; 4] = [
        Authorization::Read,
        Authorization::Write,
        Authorization::Execute,
        Authorization::Create,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Authorization::Read => "READ",
            Authorization::Write => "WRITE",
            Authorization::Execute => "EXECUTE",
            Authorization::Create => "CREATE",
        }
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Authorization {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Ok(Authorization::Read),
            "WRITE" => Ok(Authorization::Write),
            "EXECUTE" => Ok(Authorization::Execute),
            "CREATE" => Ok(Authorization::Create),
            other => Err(CoreError::UnknownAuthorization(other.to_string())),
        }
    }
}

/// Mapping from access level to the role names that hold it.
///
/// Levels with no roles are never stored, so an empty value is the same
/// thing as "no rules declared": the resource is unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Rules", into = "Rules")]
pub struct Permissions {
    rules: Rules,
}

type Rules = BTreeMap<Authorization, BTreeSet<String>>;

impl From<Rules> for Permissions {
    fn from(mut rules: Rules) -> Self {
        rules.retain(|_, roles| !roles.is_empty());
        Self { rules }
    }
}

impl From<Permissions> for Rules {
    fn from(permissions: Permissions) -> Self {
        permissions.rules
    }
}

impl Permissions {
    /// Unrestricted permissions
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Start building a permission set
    pub fn builder() -> PermissionsBuilder {
        PermissionsBuilder::default()
    }

    /// Return a copy with `level` set to exactly `roles`
    pub fn with<I, S>(&self, level: Authorization, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rules = self.rules.clone();
        let roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        if roles.is_empty() {
            rules.remove(&level);
        } else {
            rules.insert(level, roles);
        }
        Self { rules }
    }

    /// Whether any access rule is declared
    pub fn is_restricted(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Role names holding `level` (empty when unset)
    pub fn get(&self, level: Authorization) -> BTreeSet<String> {
        self.rules.get(&level).cloned().unwrap_or_default()
    }

    /// Whether `level` has any role
    pub fn has(&self, level: Authorization) -> bool {
        self.rules.contains_key(&level)
    }

    /// Union of role names across all levels
    pub fn all_roles(&self) -> BTreeSet<String> {
        self.rules.values().flatten().cloned().collect()
    }

    /// Access levels granted to any of `roles`
    pub fn authorizations<'a, I>(&self, roles: I) -> BTreeSet<Authorization>
    where
        I: IntoIterator<Item = &'a Role>,
    {
        let mut granted = BTreeSet::new();
        for role in roles {
            for (level, holders) in &self.rules {
                if holders.contains(role.name()) {
                    granted.insert(*level);
                }
            }
        }
        granted
    }

    /// Whether at least one of `roles` holds some access level
    pub fn is_authorized<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles
            .into_iter()
            .any(|role| self.rules.values().any(|holders| holders.contains(role.name())))
    }

    /// Iterate declared (level, roles) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Authorization, &BTreeSet<String>)> {
        self.rules.iter()
    }
}

/// Builder for [`Permissions`]
#[derive(Debug, Default)]
pub struct PermissionsBuilder {
    rules: Rules,
}

impl PermissionsBuilder {
    /// Grant `level` to `role`
    pub fn add(mut self, level: Authorization, role: impl Into<String>) -> Self {
        self.rules.entry(level).or_default().insert(role.into());
        self
    }

    /// Grant `level` to every role in `roles`
    pub fn add_all<I, S>(mut self, level: Authorization, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.rules.entry(level).or_default();
        entry.extend(roles.into_iter().map(Into::into));
        if entry.is_empty() {
            self.rules.remove(&level);
        }
        self
    }

    /// Finish building
    pub fn build(self) -> Permissions {
        Permissions { rules: self.rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<Role> {
        names.iter().map(|n| Role::new(*n)).collect()
    }

    #[test]
    fn test_empty_permissions_are_unrestricted() {
        let permissions = Permissions::unrestricted();
        assert!(!permissions.is_restricted());
        assert!(permissions.all_roles().is_empty());

        let emptied = Permissions::builder()
            .add_all(Authorization::Read, Vec::<String>::new())
            .build();
        assert!(!emptied.is_restricted());
    }

    #[test]
    fn test_authorizations_for_roles() {
        let permissions = Permissions::builder()
            .add(Authorization::Read, "eng")
            .add(Authorization::Read, "ops")
            .add(Authorization::Write, "ops")
            .build();

        let granted = permissions.authorizations(&roles(&["eng"]));
        assert_eq!(granted.into_iter().collect::<Vec<_>>(), vec![Authorization::Read]);

        let granted = permissions.authorizations(&roles(&["ops"]));
        assert_eq!(granted.len(), 2);

        assert!(permissions.is_authorized(&roles(&["sales", "ops"])));
        assert!(!permissions.is_authorized(&roles(&["sales"])));
        assert!(!permissions.is_authorized(&roles(&[])));
    }

    #[test]
    fn test_with_replaces_level() {
        let permissions = Permissions::builder().add(Authorization::Read, "eng").build();
        let updated = permissions.with(Authorization::Execute, ["eng", "ops"]);

        assert_eq!(updated.get(Authorization::Execute).len(), 2);
        assert_eq!(permissions.get(Authorization::Execute).len(), 0);

        let cleared = updated.with(Authorization::Execute, Vec::<String>::new());
        assert!(!cleared.has(Authorization::Execute));
    }

    #[test]
    fn test_authorization_parsing() {
        assert_eq!("read".parse::<Authorization>().unwrap(), Authorization::Read);
        assert_eq!("EXECUTE".parse::<Authorization>().unwrap(), Authorization::Execute);
        assert!("delete".parse::<Authorization>().is_err());
    }

    #[test]
    fn test_permissions_serialize_as_map() {
        let permissions = Permissions::builder()
            .add(Authorization::Write, "ops")
            .add(Authorization::Read, "eng")
            .build();

        let json = serde_json::to_string(&permissions).unwrap();
        assert_eq!(json, r#"{"READ":["eng"],"WRITE":["ops"]}"#);

        let parsed: Permissions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, permissions);

        let declared_empty: Permissions = serde_json::from_str(r#"{"READ":[]}"#).unwrap();
        assert!(!declared_empty.is_restricted());
    }
}
