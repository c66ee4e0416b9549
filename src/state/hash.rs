//! Declaration set fingerprints for change detection.
//!
//! Fingerprints are computed over redacted declarations, so secrets never
//! influence a stored hash. Engine identifiers appear inside declarations
//! as references; callers fingerprint a dry-run rendering to keep them
//! stable.

use sha2::{Digest, Sha256};

use crate::error::{Result, StateError};
use crate::topology::Declaration;

/// Length of the abbreviated hash shown to users.
const SHORT_HASH_LEN: usize = 12;

/// Hasher for declarations and declaration sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclarationHasher;

impl DeclarationHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hashes one declaration.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the declaration cannot be encoded.
    pub fn hash_declaration(&self, declaration: &Declaration) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(encode(declaration)?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Hashes an ordered declaration set.
    ///
    /// Order matters: the same declarations submitted in a different order
    /// form a different set.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a declaration cannot be encoded.
    pub fn fingerprint<'a>(&self, declarations: impl IntoIterator<Item = &'a Declaration>) -> Result<String> {
        let mut hasher = Sha256::new();
        for declaration in declarations {
            hasher.update(declaration.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(encode(declaration)?);
            hasher.update([b'\n']);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Returns the abbreviated form of a hash.
    #[must_use]
    pub fn short_hash<'h>(&self, hash: &'h str) -> &'h str {
        hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
    }

    /// Checks whether two hashes are identical.
    #[must_use]
    pub fn hashes_match(a: &str, b: &str) -> bool {
        a == b
    }
}

fn encode(declaration: &Declaration) -> Result<Vec<u8>> {
    serde_json::to_vec(&declaration.redacted())
        .map_err(|e| StateError::serialization(format!("Failed to encode '{}': {e}", declaration.name)).into())
}
