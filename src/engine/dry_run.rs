//! In-process engine used for planning.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ProvisioningError;
use crate::topology::{Declaration, ResourceId};

use super::ProvisioningEngine;

/// Number of hex characters in a generated identifier suffix.
const ID_SUFFIX_LEN: usize = 12;

/// Engine that accepts every declaration without touching any cloud.
///
/// Identifiers are derived from the declaration's kind and name, so the
/// same declaration set always yields the same identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunEngine;

impl DryRunEngine {
    /// Creates a dry-run engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the identifier the dry run assigns to a declaration.
    #[must_use]
    pub fn identifier_for(declaration: &Declaration) -> ResourceId {
        let mut hasher = Sha256::new();
        hasher.update(declaration.kind().as_bytes());
        hasher.update([0u8]);
        hasher.update(declaration.name.as_bytes());
        let digest = hex::encode(hasher.finalize());

        ResourceId::new(format!(
            "{}-{}",
            declaration.spec.id_prefix(),
            &digest[..ID_SUFFIX_LEN]
        ))
    }
}

#[async_trait]
impl ProvisioningEngine for DryRunEngine {
    async fn submit(&self, declaration: &Declaration) -> Result<ResourceId, ProvisioningError> {
        let id = Self::identifier_for(declaration);
        debug!("dry-run: {} '{}' -> {id}", declaration.kind(), declaration.name);
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
