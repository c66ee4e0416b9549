//! Stack manifest storage.
//!
//! After a successful apply the submitted declarations, the identifiers
//! the engine returned and a fingerprint of the set are recorded, either
//! in a local file or in S3.

mod hash;
mod local;
mod s3;
mod store;
mod types;

use std::path::Path;
use tracing::debug;

use crate::config::{StateBackend, StateConfig};
use crate::error::{ConfigError, Result};

pub use hash::DeclarationHasher;
pub use local::{LocalManifestStore, MANIFEST_DIR};
pub use s3::S3ManifestStore;
pub use store::ManifestStore;
pub use types::{MANIFEST_VERSION, MAX_HISTORY, ManifestDiff, ManifestEntry, ManifestHistoryEntry, StackManifest};

/// Opens the manifest store the configuration selects.
///
/// A relative local path is resolved against `base_dir`, normally the
/// directory holding the configuration file.
///
/// # Errors
///
/// Returns an error if the S3 backend is selected without a bucket.
pub async fn open_store(config: &StateConfig, base_dir: &Path) -> Result<Box<dyn ManifestStore>> {
    let store: Box<dyn ManifestStore> = match config.backend {
        StateBackend::Local => {
            let dir = config
                .path
                .as_deref()
                .map_or_else(|| base_dir.join(MANIFEST_DIR), |p| base_dir.join(p));
            Box::new(LocalManifestStore::with_base_dir(dir))
        }
        StateBackend::S3 => {
            let bucket = config
                .bucket
                .as_deref()
                .ok_or_else(|| ConfigError::missing("state.bucket"))?;
            Box::new(S3ManifestStore::new(bucket, config.prefix.as_deref(), config.region.as_deref()).await)
        }
    };

    debug!("Using {} manifest store at {}", store.backend_type(), store.location());
    Ok(store)
}
