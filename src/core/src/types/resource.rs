//! Access-controlled resource variants

use crate::error::CoreError;
use crate::types::permissions::{Authorization, Permissions};
use crate::types::role::{Role, RoleSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource variant discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    /// Cloud account
    Account,
    /// Application
    Application,
    /// CI build master
    BuildService,
    /// Delivery pipeline
    Pipeline,
    /// Service account identity
    ServiceAccount,
}

impl ResourceType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Account => "ACCOUNT",
            ResourceType::Application => "APPLICATION",
            ResourceType::BuildService => "BUILD_SERVICE",
            ResourceType::Pipeline => "PIPELINE",
            ResourceType::ServiceAccount => "SERVICE_ACCOUNT",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACCOUNT" => Ok(ResourceType::Account),
            "APPLICATION" => Ok(ResourceType::Application),
            "BUILD_SERVICE" => Ok(ResourceType::BuildService),
            "PIPELINE" => Ok(ResourceType::Pipeline),
            "SERVICE_ACCOUNT" => Ok(ResourceType::ServiceAccount),
            other => Err(CoreError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Identity of a resource across all variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Variant
    pub resource_type: ResourceType,
    /// Identifying name within the variant
    pub name: String,
}

impl ResourceKey {
    /// Create a resource key
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.name)
    }
}

/// Capability shared by every access-controlled resource variant
pub trait Resource: Clone + Send + Sync + 'static {
    /// Variant of this resource type
    const TYPE: ResourceType;

    /// Identifying name
    fn name(&self) -> &str;

    /// Current access rules
    fn permissions(&self) -> Permissions;

    /// Replace the access rules
    fn set_permissions(&mut self, permissions: Permissions);

    /// Variant of this resource
    fn resource_type(&self) -> ResourceType {
        Self::TYPE
    }

    /// Identity key
    fn key(&self) -> ResourceKey {
        ResourceKey::new(Self::TYPE, self.name())
    }
}

/// Cloud account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cloud_provider: None,
            permissions: Permissions::default(),
        }
    }

    pub fn with_cloud_provider(mut self, cloud_provider: impl Into<String>) -> Self {
        self.cloud_provider = Some(cloud_provider.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Resource for Account {
    const TYPE: ResourceType = ResourceType::Account;

    fn name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> Permissions {
        self.permissions.clone()
    }

    fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
    }
}

/// Application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Permissions::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Resource for Application {
    const TYPE: ResourceType = ResourceType::Application;

    fn name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> Permissions {
        self.permissions.clone()
    }

    fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
    }
}

/// CI build service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildService {
    pub name: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl BuildService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Permissions::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Resource for BuildService {
    const TYPE: ResourceType = ResourceType::BuildService;

    fn name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> Permissions {
        self.permissions.clone()
    }

    fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
    }
}

/// Delivery pipeline, keyed by its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    /// Owning application name
    pub application: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Pipeline {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            application: application.into(),
            permissions: Permissions::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Resource for Pipeline {
    const TYPE: ResourceType = ResourceType::Pipeline;

    fn name(&self) -> &str {
        &self.id
    }

    fn permissions(&self) -> Permissions {
        self.permissions.clone()
    }

    fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
    }
}

/// Service account: a locally defined identity whose grants are its
/// `member_of` roles. Every member role may read and write the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub name: String,
    #[serde(default)]
    pub member_of: Vec<String>,
}

impl ServiceAccount {
    pub fn new<I, S>(name: impl Into<String>, member_of: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            member_of: member_of.into_iter().map(Into::into).collect(),
        }
    }

    /// Roles this account acts with
    pub fn roles(&self) -> Vec<Role> {
        self.member_of
            .iter()
            .map(|name| Role::new(name.as_str()).with_source(RoleSource::ServiceAccount))
            .collect()
    }

    /// Identity view of this account: id = name, roles = memberships
    pub fn to_user_permission(&self) -> crate::types::user::UserPermission {
        crate::types::user::UserPermission::new(self.name.clone()).with_roles(self.roles())
    }
}

impl Resource for ServiceAccount {
    const TYPE: ResourceType = ResourceType::ServiceAccount;

    fn name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> Permissions {
        Permissions::builder()
            .add_all(Authorization::Read, self.member_of.iter().cloned())
            .add_all(Authorization::Write, self.member_of.iter().cloned())
            .build()
    }

    fn set_permissions(&mut self, permissions: Permissions) {
        self.member_of = permissions.all_roles().into_iter().collect();
    }
}

/// Any resource variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnyResource {
    Account(Account),
    Application(Application),
    BuildService(BuildService),
    Pipeline(Pipeline),
    ServiceAccount(ServiceAccount),
}

impl AnyResource {
    /// Variant of the wrapped resource
    pub fn resource_type(&self) -> ResourceType {
        match self {
            AnyResource::Account(_) => ResourceType::Account,
            AnyResource::Application(_) => ResourceType::Application,
            AnyResource::BuildService(_) => ResourceType::BuildService,
            AnyResource::Pipeline(_) => ResourceType::Pipeline,
            AnyResource::ServiceAccount(_) => ResourceType::ServiceAccount,
        }
    }

    /// Identifying name of the wrapped resource
    pub fn name(&self) -> &str {
        match self {
            AnyResource::Account(r) => r.name(),
            AnyResource::Application(r) => r.name(),
            AnyResource::BuildService(r) => r.name(),
            AnyResource::Pipeline(r) => r.name(),
            AnyResource::ServiceAccount(r) => r.name(),
        }
    }

    /// Access rules of the wrapped resource
    pub fn permissions(&self) -> Permissions {
        match self {
            AnyResource::Account(r) => r.permissions(),
            AnyResource::Application(r) => r.permissions(),
            AnyResource::BuildService(r) => r.permissions(),
            AnyResource::Pipeline(r) => r.permissions(),
            AnyResource::ServiceAccount(r) => r.permissions(),
        }
    }

    /// Identity key
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type(), self.name())
    }
}

macro_rules! impl_from_resource {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AnyResource {
                fn from(resource: $variant) -> Self {
                    AnyResource::$variant(resource)
                }
            }
        )*
    };
}

impl_from_resource!(Account, Application, BuildService, Pipeline, ServiceAccount);
