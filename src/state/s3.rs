//! S3-based manifest backend.
//!
//! Stores the manifest as a single JSON object, `{prefix}manifest.json`,
//! so a team can share the record of the last apply.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::{debug, info};

use crate::error::{Result, StateError};

use super::store::ManifestStore;
use super::types::StackManifest;

/// Manifest object key suffix.
const MANIFEST_KEY: &str = "manifest.json";

/// S3-based manifest store.
#[derive(Debug)]
pub struct S3ManifestStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix, empty or ending in `/`.
    prefix: String,
}

impl S3ManifestStore {
    /// Creates a store from the ambient AWS configuration.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Self {
            client: Client::new(&config),
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        }
    }

    fn key(&self) -> String {
        format!("{}{MANIFEST_KEY}", self.prefix)
    }
}

/// Turns an optional user prefix into `""` or `"some/path/"`.
fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}/"))
        .unwrap_or_default()
}

#[async_trait]
impl ManifestStore for S3ManifestStore {
    async fn load(&self) -> Result<Option<StackManifest>> {
        let key = self.key();
        debug!("Loading manifest from s3://{}/{key}", self.bucket);

        let response = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(response) => response,
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    debug!("No manifest found in S3");
                    return Ok(None);
                }
                return Err(StateError::s3(format!("S3 get error: {}", DisplayErrorContext(&service_err))).into());
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StateError::s3(format!("Failed to read S3 object: {e}")))?;

        let manifest: StackManifest =
            serde_json::from_slice(&bytes.into_bytes()).map_err(|e| StateError::Corrupted {
                message: format!("Failed to parse s3://{}/{key}: {e}", self.bucket),
            })?;
        manifest.check_version()?;

        info!("Loaded manifest for {}/{}", manifest.project, manifest.environment);
        Ok(Some(manifest))
    }

    async fn save(&self, manifest: &StackManifest) -> Result<()> {
        let key = self.key();
        info!("Writing manifest to s3://{}/{key}", self.bucket);

        let content = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StateError::serialization(format!("Failed to serialize manifest: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(content.into())
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StateError::s3(format!("S3 put error: {}", DisplayErrorContext(&e))))?;

        debug!("Manifest saved to S3");
        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key())
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(None), "");
        assert_eq!(normalize_prefix(Some("")), "");
        assert_eq!(normalize_prefix(Some("/")), "");
        assert_eq!(normalize_prefix(Some("stacks/prod")), "stacks/prod/");
        assert_eq!(normalize_prefix(Some("/stacks/prod/")), "stacks/prod/");
    }
}
