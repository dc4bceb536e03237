//! Backing sources for provider caches

use crate::error::ProviderError;
use async_trait::async_trait;
use parking_lot::RwLock;
use rolegate_core::Resource;

/// Supplies the authoritative list of one resource variant
#[async_trait]
pub trait ResourceLoader<R: Resource>: Send + Sync {
    /// Fetch every resource from the backing service
    async fn load_all(&self) -> Result<Vec<R>, ProviderError>;
}

/// Loader over a list held in memory, replaced wholesale with [`set`](Self::set).
/// Suits statically configured resources such as accounts from a config file.
pub struct StaticResourceLoader<R> {
    resources: RwLock<Vec<R>>,
}

impl<R: Resource> StaticResourceLoader<R> {
    pub fn new(resources: Vec<R>) -> Self {
        Self {
            resources: RwLock::new(resources),
        }
    }

    /// Replace the list served on the next load
    pub fn set(&self, resources: Vec<R>) {
        *self.resources.write() = resources;
    }
}

impl<R: Resource> Default for StaticResourceLoader<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl<R: Resource> ResourceLoader<R> for StaticResourceLoader<R> {
    async fn load_all(&self) -> Result<Vec<R>, ProviderError> {
        Ok(self.resources.read().clone())
    }
}
