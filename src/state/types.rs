//! Manifest types recording what a stack run declared.
//!
//! A manifest is written after a successful apply. It is a record for
//! humans and for change detection, never an input to planning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Result, StackError, StateError};
use crate::topology::{Declaration, ResourceId, Submission, Zone};

use super::hash::DeclarationHasher;

/// Current version of the manifest format.
pub const MANIFEST_VERSION: &str = "1.0";

/// Maximum number of history entries kept in a manifest.
pub const MAX_HISTORY: usize = 20;

/// The recorded result of the last successful apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackManifest {
    /// Manifest format version.
    pub version: String,
    /// Project name.
    pub project: String,
    /// Environment name.
    pub environment: String,
    /// Identifier of the run that wrote this manifest.
    pub run_id: Uuid,
    /// Fingerprint of the declaration set.
    pub fingerprint: String,
    /// Engine the declarations were submitted to.
    pub engine: String,
    /// Zones the topology spans, in order.
    pub zones: Vec<Zone>,
    /// Every submitted declaration, in order.
    pub resources: Vec<ManifestEntry>,
    /// When the manifest was written.
    pub generated_at: DateTime<Utc>,
    /// Previous runs, oldest first.
    #[serde(default)]
    pub history: Vec<ManifestHistoryEntry>,
}

/// One submitted declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Structural name.
    pub name: String,
    /// Resource kind.
    pub kind: String,
    /// Identifier the engine returned.
    pub id: ResourceId,
    /// Hash of the declaration.
    pub hash: String,
    /// The declaration with secrets redacted.
    pub declaration: Declaration,
}

/// Summary of a past run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestHistoryEntry {
    /// Run identifier.
    pub run_id: Uuid,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Fingerprint of the declaration set.
    pub fingerprint: String,
    /// Engine used.
    pub engine: String,
    /// Number of declarations submitted.
    pub resource_count: usize,
}

/// Per-declaration comparison between a manifest and a new declaration set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    /// Declarations not present in the manifest.
    pub added: Vec<String>,
    /// Declarations whose properties changed.
    pub changed: Vec<String>,
    /// Manifest entries no longer declared.
    pub removed: Vec<String>,
    /// Number of unchanged declarations.
    pub unchanged: usize,
}

impl StackManifest {
    /// Builds a manifest from the submissions of a run.
    ///
    /// `preview` is the dry-run rendering of the same run, index-aligned
    /// with `applied`. Hashes and the fingerprint are taken from it so
    /// they do not depend on the identifiers a particular engine hands out.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a declaration cannot be hashed,
    /// or an internal error if `preview` does not match `applied`.
    pub fn from_run(
        project: &str,
        environment: &str,
        engine: &str,
        zones: Vec<Zone>,
        applied: &[Submission],
        preview: &[Declaration],
    ) -> Result<Self> {
        let aligned = applied.len() == preview.len()
            && applied.iter().zip(preview).all(|(a, p)| a.declaration.name == p.name);
        if !aligned {
            return Err(StackError::internal("applied declarations do not match the preview"));
        }

        let hasher = DeclarationHasher::new();
        let fingerprint = hasher.fingerprint(preview)?;
        let resources = applied
            .iter()
            .zip(preview)
            .map(|(s, p)| {
                Ok(ManifestEntry {
                    name: s.declaration.name.clone(),
                    kind: s.declaration.kind().to_string(),
                    id: s.id.clone(),
                    hash: hasher.hash_declaration(p)?,
                    declaration: s.declaration.redacted(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: MANIFEST_VERSION.to_string(),
            project: project.to_string(),
            environment: environment.to_string(),
            run_id: Uuid::new_v4(),
            fingerprint,
            engine: engine.to_string(),
            zones,
            resources,
            generated_at: Utc::now(),
            history: Vec::new(),
        })
    }

    /// Carries over the history of the previous manifest and appends this run.
    #[must_use]
    pub fn with_history(mut self, previous: Option<Self>) -> Self {
        if let Some(previous) = previous {
            self.history = previous.history;
        }
        let entry = self.history_entry();
        self.add_history(entry);
        self
    }

    /// Adds a history entry, dropping the oldest beyond [`MAX_HISTORY`].
    pub fn add_history(&mut self, entry: ManifestHistoryEntry) {
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    /// Returns the summary of this run.
    #[must_use]
    pub fn history_entry(&self) -> ManifestHistoryEntry {
        ManifestHistoryEntry {
            run_id: self.run_id,
            timestamp: self.generated_at,
            fingerprint: self.fingerprint.clone(),
            engine: self.engine.clone(),
            resource_count: self.resources.len(),
        }
    }

    /// Returns true if this manifest already records `diff`'s declaration
    /// set as applied through `engine`.
    ///
    /// Declaration hashes do not cover the engine, so a switch of engine
    /// always counts as a change.
    #[must_use]
    pub fn is_current(&self, engine: &str, diff: &ManifestDiff) -> bool {
        self.engine == engine && diff.is_empty()
    }

    /// Checks that the manifest was written in a format this build reads.
    ///
    /// # Errors
    ///
    /// Returns `StateError::VersionMismatch` for any other version.
    pub fn check_version(&self) -> Result<()> {
        if self.version == MANIFEST_VERSION {
            Ok(())
        } else {
            Err(StateError::VersionMismatch {
                expected: MANIFEST_VERSION.to_string(),
                found: self.version.clone(),
            }
            .into())
        }
    }

    /// Compares the recorded declarations with a new declaration set.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a declaration cannot be hashed.
    pub fn diff<'a>(&self, declarations: impl IntoIterator<Item = &'a Declaration>) -> Result<ManifestDiff> {
        let hasher = DeclarationHasher::new();
        let mut recorded: BTreeMap<&str, &str> = self
            .resources
            .iter()
            .map(|e| (e.name.as_str(), e.hash.as_str()))
            .collect();

        let mut diff = ManifestDiff::default();
        for declaration in declarations {
            let hash = hasher.hash_declaration(declaration)?;
            match recorded.remove(declaration.name.as_str()) {
                None => diff.added.push(declaration.name.clone()),
                Some(old) if DeclarationHasher::hashes_match(old, &hash) => diff.unchanged += 1,
                Some(_) => diff.changed.push(declaration.name.clone()),
            }
        }
        diff.removed = recorded.into_keys().map(str::to_string).collect();

        Ok(diff)
    }
}

impl ManifestDiff {
    /// Returns true if nothing was added, changed or removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

impl std::fmt::Display for ManifestDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} no longer declared, {} unchanged",
            self.added.len(),
            self.changed.len(),
            self.removed.len(),
            self.unchanged
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::ResourceSpec;

    fn submission(name: &str, vpc: &str) -> Submission {
        Submission {
            declaration: Declaration::new(
                name,
                ResourceSpec::RouteTable {
                    vpc_id: ResourceId::new(vpc),
                },
            ),
            id: ResourceId::new(format!("rtb-{name}")),
        }
    }

    fn manifest(submissions: &[Submission]) -> StackManifest {
        let preview: Vec<Declaration> = submissions.iter().map(|s| s.declaration.clone()).collect();
        StackManifest::from_run("app", "dev", "dry-run", vec![Zone::new("a")], submissions, &preview).unwrap()
    }

    #[test]
    fn test_from_run_records_entries() {
        let m = manifest(&[submission("one", "vpc-1"), submission("two", "vpc-1")]);
        assert_eq!(m.version, MANIFEST_VERSION);
        assert_eq!(m.resources.len(), 2);
        assert_eq!(m.resources[1].name, "two");
        assert_eq!(m.resources[1].id, ResourceId::new("rtb-two"));
        assert_eq!(m.resources[0].kind, "route_table");
    }

    #[test]
    fn test_fingerprint_comes_from_preview() {
        let applied = [submission("one", "vpc-live")];
        let preview = [submission("one", "vpc-dry").declaration];
        let m = StackManifest::from_run("app", "dev", "http", vec![], &applied, &preview).unwrap();

        let hasher = DeclarationHasher::new();
        assert_eq!(m.fingerprint, hasher.fingerprint(&preview).unwrap());
        assert!(m.diff(&preview).unwrap().is_empty());
        assert_eq!(m.resources[0].declaration, applied[0].declaration);
    }

    #[test]
    fn test_mismatched_preview_is_rejected() {
        let applied = [submission("one", "vpc-1")];
        let preview = [submission("two", "vpc-1").declaration];
        assert!(StackManifest::from_run("app", "dev", "http", vec![], &applied, &preview).is_err());
    }

    #[test]
    fn test_history_is_carried_and_capped() {
        let mut previous = manifest(&[]);
        for _ in 0..MAX_HISTORY {
            let entry = previous.history_entry();
            previous.add_history(entry);
        }
        let oldest = previous.history[0].run_id;

        let next = manifest(&[]).with_history(Some(previous));
        assert_eq!(next.history.len(), MAX_HISTORY);
        assert_eq!(next.history.last().unwrap().run_id, next.run_id);
        assert_eq!(next.history.iter().filter(|h| h.run_id == oldest).count(), MAX_HISTORY - 1);
    }

    #[test]
    fn test_first_run_history() {
        let m = manifest(&[submission("one", "vpc-1")]).with_history(None);
        assert_eq!(m.history.len(), 1);
        assert_eq!(m.history[0].resource_count, 1);
    }

    #[test]
    fn test_diff() {
        let m = manifest(&[submission("kept", "vpc-1"), submission("edited", "vpc-1"), submission("gone", "vpc-1")]);
        let next = [submission("kept", "vpc-1"), submission("edited", "vpc-2"), submission("new", "vpc-1")];

        let diff = m.diff(next.iter().map(|s| &s.declaration)).unwrap();
        assert_eq!(diff.added, ["new"]);
        assert_eq!(diff.changed, ["edited"]);
        assert_eq!(diff.removed, ["gone"]);
        assert_eq!(diff.unchanged, 1);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_is_current_requires_same_engine() {
        let declarations = [submission("one", "vpc-1"), submission("two", "vpc-1")];
        let m = manifest(&declarations);
        let diff = m.diff(declarations.iter().map(|s| &s.declaration)).unwrap();

        assert!(diff.is_empty());
        assert!(m.is_current("dry-run", &diff));
        assert!(!m.is_current("http", &diff));
    }

    #[test]
    fn test_is_current_with_changes() {
        let m = manifest(&[submission("one", "vpc-1")]);
        let next = [submission("one", "vpc-2")];
        let diff = m.diff(next.iter().map(|s| &s.declaration)).unwrap();

        assert!(!m.is_current("dry-run", &diff));
    }

    #[test]
    fn test_version_mismatch() {
        let mut m = manifest(&[]);
        assert!(m.check_version().is_ok());
        m.version = String::from("0.1");
        assert!(m.check_version().is_err());
    }
}
