//! Identities under resolution and their resolved permissions

use crate::types::resource::{AnyResource, ResourceKey, ResourceType};
use crate::types::role::{Role, RoleSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Sentinel id of the anonymous/unrestricted caller
pub const UNRESTRICTED_USERNAME: &str = "__unrestricted_user__";

/// Whether `id` names the reserved unrestricted identity (ASCII case-insensitive)
pub fn is_unrestricted_user(id: &str) -> bool {
    id.eq_ignore_ascii_case(UNRESTRICTED_USERNAME)
}

/// An identity being resolved, with roles supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUser {
    pub id: String,
    #[serde(default)]
    pub external_roles: Vec<Role>,
}

impl ExternalUser {
    /// Identity with no caller-supplied roles
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_roles: Vec::new(),
        }
    }

    /// Attach caller-supplied roles, tagged as external
    pub fn with_external_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.external_roles.extend(roles.into_iter().map(|role| {
            let role = role.into();
            match role.source {
                Some(_) => role,
                None => role.with_source(RoleSource::External),
            }
        }));
        self
    }
}

/// Resolved permissions of one identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPermission {
    /// Identity id
    pub id: String,

    /// Resolved role set (deduplicated by name)
    pub roles: HashSet<Role>,

    /// Whether the roles intersect the configured admin roles
    pub admin: bool,

    #[serde(default, with = "resource_list")]
    resources: BTreeMap<ResourceKey, AnyResource>,
}

/// Resources travel as a flat list; the key is recomputed on the way in.
mod resource_list {
    use super::{AnyResource, ResourceKey};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        resources: &BTreeMap<ResourceKey, AnyResource>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(resources.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<ResourceKey, AnyResource>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<AnyResource>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|r| (r.key(), r)).collect())
    }
}

impl UserPermission {
    /// Empty permission record for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Replace the role set
    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the admin flag
    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Add resources; a resource already present under the same key is replaced
    pub fn add_resources<I>(&mut self, resources: I) -> &mut Self
    where
        I: IntoIterator<Item = AnyResource>,
    {
        for resource in resources {
            self.resources.insert(resource.key(), resource);
        }
        self
    }

    /// Add one resource
    pub fn add_resource(&mut self, resource: impl Into<AnyResource>) -> &mut Self {
        let resource = resource.into();
        self.resources.insert(resource.key(), resource);
        self
    }

    /// All accumulated resources, ordered by key
    pub fn resources(&self) -> impl Iterator<Item = &AnyResource> {
        self.resources.values()
    }

    /// Accumulated resources of one variant
    pub fn resources_of(&self, resource_type: ResourceType) -> impl Iterator<Item = &AnyResource> {
        self.resources
            .values()
            .filter(move |resource| resource.resource_type() == resource_type)
    }

    /// Whether a resource with `key` is present
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Number of accumulated resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Sorted role names
    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }

    /// Whether this is the reserved unrestricted identity
    pub fn is_unrestricted_user(&self) -> bool {
        is_unrestricted_user(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::permissions::{Authorization, Permissions};
    use crate::types::resource::{Application, Pipeline};

    #[test]
    fn test_unrestricted_user_matching() {
        assert!(is_unrestricted_user("__unrestricted_user__"));
        assert!(is_unrestricted_user("__UNRESTRICTED_USER__"));
        assert!(!is_unrestricted_user("alice"));
    }

    #[test]
    fn test_external_roles_are_tagged() {
        let user = ExternalUser::new("alice")
            .with_external_roles(["eng"])
            .with_external_roles([Role::new("ops").with_source(RoleSource::File)]);

        assert_eq!(user.external_roles[0].source, Some(RoleSource::External));
        assert_eq!(user.external_roles[1].source, Some(RoleSource::File));
    }

    #[test]
    fn test_resources_deduplicate_by_key() {
        let mut permission = UserPermission::new("alice");
        let restricted = Application::new("checkout")
            .with_permissions(Permissions::builder().add(Authorization::Read, "eng").build());

        permission.add_resource(Application::new("checkout"));
        permission.add_resources(vec![restricted.clone().into()]);
        permission.add_resource(Pipeline::new("p-1", "deploy", "checkout"));

        assert_eq!(permission.resource_count(), 2);
        assert_eq!(permission.resources_of(ResourceType::Application).count(), 1);

        let app = permission
            .resources_of(ResourceType::Application)
            .next()
            .unwrap();
        assert_eq!(app, &AnyResource::Application(restricted));
    }

    #[test]
    fn test_user_permission_json() {
        let mut permission = UserPermission::new("alice").with_roles(["eng"]).with_admin(true);
        permission.add_resource(Pipeline::new("p-1", "deploy", "checkout"));

        let json = serde_json::to_value(&permission).unwrap();
        assert_eq!(json["resources"][0]["resourceType"], "PIPELINE");

        let parsed: UserPermission = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, permission);
    }

    #[test]
    fn test_role_names_sorted() {
        let permission = UserPermission::new("alice").with_roles(["ops", "eng", "eng"]);
        assert_eq!(permission.role_names(), vec!["eng", "ops"]);
    }
}
