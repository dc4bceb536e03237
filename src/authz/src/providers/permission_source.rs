//! Where a resource's declared permissions come from

use super::cached::CachedResourceProvider;
use rolegate_core::{Application, Permissions, Pipeline, Resource};
use std::sync::Arc;

/// Produces the declared permissions of a freshly loaded resource
pub trait ResourcePermissionSource<R: Resource>: Send + Sync {
    fn permissions(&self, resource: &R) -> Permissions;
}

/// Uses whatever the backing service attached to the resource
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredPermissionSource;

impl<R: Resource> ResourcePermissionSource<R> for DeclaredPermissionSource {
    fn permissions(&self, resource: &R) -> Permissions {
        resource.permissions()
    }
}

/// Pipelines that declare nothing inherit the permissions of their
/// application, read from the application provider's current snapshot.
///
/// The application provider must be refreshed before the pipeline provider
/// for inheritance to see current rules; a missing snapshot or unknown
/// application leaves the pipeline unrestricted.
pub struct ApplicationPermissionSource {
    applications: Arc<CachedResourceProvider<Application>>,
}

impl ApplicationPermissionSource {
    pub fn new(applications: Arc<CachedResourceProvider<Application>>) -> Self {
        Self { applications }
    }
}

impl ResourcePermissionSource<Pipeline> for ApplicationPermissionSource {
    fn permissions(&self, pipeline: &Pipeline) -> Permissions {
        if pipeline.permissions.is_restricted() {
            return pipeline.permissions.clone();
        }

        self.applications
            .current()
            .and_then(|snapshot| {
                snapshot
                    .get(&pipeline.application)
                    .map(|app| app.permissions.clone())
            })
            .unwrap_or_default()
    }
}
