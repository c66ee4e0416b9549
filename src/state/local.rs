//! Local file-based manifest backend.
//!
//! The manifest lives in `.aurora/manifest.json` next to the stack
//! configuration and is replaced atomically on every save.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, StateError};

use super::store::ManifestStore;
use super::types::StackManifest;

/// Default manifest directory name.
pub const MANIFEST_DIR: &str = ".aurora";

/// Manifest file name.
const MANIFEST_FILE: &str = "manifest.json";

/// Local file-based manifest store.
#[derive(Debug)]
pub struct LocalManifestStore {
    /// Directory holding the manifest.
    base_dir: PathBuf,
    /// Path to the manifest file.
    manifest_path: PathBuf,
}

impl LocalManifestStore {
    /// Creates a store in a custom directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let manifest_path = base_dir.join(MANIFEST_FILE);
        Self {
            base_dir,
            manifest_path,
        }
    }

    /// Returns the manifest file path.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating manifest directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir)
                .await
                .map_err(|e| StateError::local(format!("Failed to create manifest directory: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ManifestStore for LocalManifestStore {
    async fn load(&self) -> Result<Option<StackManifest>> {
        if !self.manifest_path.exists() {
            debug!("Manifest does not exist: {}", self.manifest_path.display());
            return Ok(None);
        }

        debug!("Loading manifest from: {}", self.manifest_path.display());

        let content = fs::read_to_string(&self.manifest_path)
            .await
            .map_err(|e| StateError::local(format!("Failed to read manifest: {e}")))?;

        let manifest: StackManifest = serde_json::from_str(&content).map_err(|e| StateError::Corrupted {
            message: format!("Failed to parse {}: {e}", self.manifest_path.display()),
        })?;
        manifest.check_version()?;

        Ok(Some(manifest))
    }

    async fn save(&self, manifest: &StackManifest) -> Result<()> {
        self.ensure_dir().await?;

        info!("Writing manifest to: {}", self.manifest_path.display());

        let content = serde_json::to_string_pretty(manifest)
            .map_err(|e| StateError::serialization(format!("Failed to serialize manifest: {e}")))?;

        // Write beside the target, then rename over it.
        let temp_path = self.manifest_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StateError::local(format!("Failed to create temp manifest: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StateError::local(format!("Failed to write manifest: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| StateError::local(format!("Failed to sync manifest: {e}")))?;

        fs::rename(&temp_path, &self.manifest_path)
            .await
            .map_err(|e| StateError::local(format!("Failed to replace manifest: {e}")))?;

        debug!("Manifest saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.manifest_path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::topology::Zone;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalManifestStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalManifestStore::with_base_dir(temp_dir.path().join(MANIFEST_DIR));
        (store, temp_dir)
    }

    fn manifest() -> StackManifest {
        StackManifest::from_run("app", "dev", "dry-run", vec![Zone::new("a")], &[], &[]).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let saved = manifest().with_history(None);
        store.save(&saved).await.expect("Failed to save manifest");

        let loaded = store
            .load()
            .await
            .expect("Failed to load manifest")
            .expect("Manifest should exist");

        assert_eq!(loaded.project, "app");
        assert_eq!(loaded.run_id, saved.run_id);
        assert_eq!(loaded.zones, vec![Zone::new("a")]);
        assert_eq!(loaded.history.len(), 1);
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();
        assert!(store.load().await.expect("Load should not fail").is_none());
        assert!(!store.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_temp_file() {
        let (store, _temp) = create_test_store();

        store.save(&manifest()).await.unwrap();
        let second = manifest();
        store.save(&second).await.unwrap();

        assert!(store.manifest_path().exists());
        assert!(!store.manifest_path().with_extension("tmp").exists());
        assert_eq!(store.load().await.unwrap().unwrap().run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_corrupted_manifest() {
        let (store, _temp) = create_test_store();
        std::fs::create_dir_all(store.manifest_path().parent().unwrap()).unwrap();
        std::fs::write(store.manifest_path(), "{ not json").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StackError::State(StateError::Corrupted { .. })));
    }

    #[test]
    fn test_location() {
        let store = LocalManifestStore::with_base_dir("/tmp/stack/.aurora");
        assert!(store.location().ends_with("manifest.json"));
        assert_eq!(store.backend_type(), "local");
    }
}
