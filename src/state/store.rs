//! Manifest store trait definition.
//!
//! Backends persist at most one manifest per stack. There is no locking:
//! concurrent applies against the same store are not coordinated.

use async_trait::async_trait;

use super::types::StackManifest;
use crate::error::Result;

/// Trait for manifest storage backends.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Loads the stored manifest.
    ///
    /// Returns `None` if nothing has been applied yet.
    async fn load(&self) -> Result<Option<StackManifest>>;

    /// Saves the manifest, replacing any previous one.
    async fn save(&self, manifest: &StackManifest) -> Result<()>;

    /// Human-readable location of the manifest.
    fn location(&self) -> String;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ManifestStore for Box<dyn ManifestStore> {
    async fn load(&self) -> Result<Option<StackManifest>> {
        (**self).load().await
    }

    async fn save(&self, manifest: &StackManifest) -> Result<()> {
        (**self).save(manifest).await
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
