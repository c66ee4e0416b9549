//! Configuration specification types for the stack planner.
//!
//! This module defines the structs that map to `aurora.stack.yaml`.
//! Everything the planner needs that it cannot derive lives here: the
//! address universe, the zone fan-out, database credentials, and where to
//! submit and record declarations.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Configuration key for the database master username.
pub const KEY_DB_USERNAME: &str = "db-username";

/// Configuration key for the database master password.
pub const KEY_DB_PASSWORD: &str = "db-password";

/// Configuration key for the cluster instance class.
pub const KEY_DB_INSTANCE_CLASS: &str = "db-instance-class";

/// The root configuration structure for a stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// Network layout configuration.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Database cluster configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Provisioning engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Manifest backend configuration.
    #[serde(default)]
    pub state: StateConfig,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Unique name for the project.
    pub name: String,
    /// Environment (e.g., "dev", "staging", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// AWS region the zones are discovered in.
    #[serde(default)]
    pub region: Option<String>,
}

/// Network layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// The /16 address universe.
    #[serde(default = "default_cidr_block")]
    pub cidr_block: String,
    /// Whether the VPC assigns DNS hostnames.
    #[serde(default = "default_true")]
    pub enable_dns_hostnames: bool,
    /// Maximum number of availability zones to spread across.
    #[serde(default = "default_max_zones")]
    pub max_zones: usize,
    /// Zones pinned in configuration. When empty, zones are discovered.
    #[serde(default)]
    pub zones: Vec<String>,
}

/// Database cluster configuration.
///
/// The credentials and instance class are externally supplied and only
/// presence-checked; see [`DatabaseConfig::credentials`].
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Master username (`db-username`).
    #[serde(default)]
    pub username: Option<String>,
    /// Master password (`db-password`).
    #[serde(default)]
    pub password: Option<String>,
    /// Instance class (`db-instance-class`).
    #[serde(default)]
    pub instance_class: Option<String>,
    /// Initial database name.
    #[serde(default = "default_database_name")]
    pub database_name: String,
    /// Cluster identifier.
    #[serde(default = "default_database_name")]
    pub cluster_identifier: String,
    /// Identifier of the single cluster instance.
    #[serde(default = "default_instance_identifier")]
    pub instance_identifier: String,
    /// Database engine.
    #[serde(default = "default_db_engine")]
    pub engine: String,
}

/// Presence-checked database values.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    /// Master username.
    pub username: String,
    /// Master password.
    pub password: String,
    /// Instance class for the cluster instance.
    pub instance_class: String,
}

/// Provisioning engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Which engine receives declarations.
    #[serde(default)]
    pub kind: EngineKind,
    /// Base URL of the HTTP engine.
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the engine bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Engine types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// In-process engine with deterministic identifiers.
    #[default]
    DryRun,
    /// Remote engine reached over HTTP.
    Http,
}

/// Manifest backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Backend type (local or s3).
    #[serde(default)]
    pub backend: StateBackend,
    /// S3 bucket name (required for s3 backend).
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 key prefix (optional).
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region (optional, uses AWS default if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Local manifest directory (for local backend).
    #[serde(default)]
    pub path: Option<String>,
}

/// Manifest backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// Local file-based storage.
    #[default]
    Local,
    /// AWS S3-based storage.
    S3,
}

// Default value functions

const fn default_true() -> bool {
    true
}

const fn default_max_zones() -> usize {
    3
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_environment() -> String {
    String::from("dev")
}

fn default_cidr_block() -> String {
    String::from("10.0.0.0/16")
}

fn default_database_name() -> String {
    String::from("aurorapostgresql")
}

fn default_instance_identifier() -> String {
    String::from("aurora-cluster-instance")
}

fn default_db_engine() -> String {
    String::from("aurora-postgresql")
}

fn default_token_env() -> String {
    String::from("AURORA_ENGINE_TOKEN")
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr_block: default_cidr_block(),
            enable_dns_hostnames: true,
            max_zones: default_max_zones(),
            zones: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            instance_class: None,
            database_name: default_database_name(),
            cluster_identifier: default_database_name(),
            instance_identifier: default_instance_identifier(),
            engine: default_db_engine(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            url: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("instance_class", &self.instance_class)
            .field("database_name", &self.database_name)
            .field("cluster_identifier", &self.cluster_identifier)
            .field("instance_identifier", &self.instance_identifier)
            .field("engine", &self.engine)
            .finish()
    }
}

impl std::fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("username", &self.username)
            .field("password", &"********")
            .field("instance_class", &self.instance_class)
            .finish()
    }
}

impl DatabaseConfig {
    /// Returns the externally supplied values, checking each is present.
    ///
    /// Values are opaque: an empty string counts as absent, nothing else
    /// is validated.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingValue` naming the first absent key.
    pub fn credentials(&self) -> Result<DatabaseCredentials> {
        Ok(DatabaseCredentials {
            username: require(self.username.as_deref(), KEY_DB_USERNAME)?,
            password: require(self.password.as_deref(), KEY_DB_PASSWORD)?,
            instance_class: require(self.instance_class.as_deref(), KEY_DB_INSTANCE_CLASS)?,
        })
    }
}

fn require(value: Option<&str>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::missing(key).into()),
    }
}

impl StackConfig {
    /// Returns the fully qualified stack name including environment.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}-{}", self.project.name, self.project.environment)
    }

    /// Returns the region label used in logs and errors.
    #[must_use]
    pub fn region_label(&self) -> &str {
        self.project.region.as_deref().unwrap_or("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;

    fn database(username: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            username: username.map(String::from),
            password: Some(String::from("s3cret")),
            instance_class: Some(String::from("db.r6g.large")),
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_credentials_present() {
        let creds = database(Some("admin")).credentials().unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.instance_class, "db.r6g.large");
    }

    #[test]
    fn test_missing_username() {
        let err = database(None).credentials().unwrap_err();
        assert!(matches!(
            err,
            StackError::Config(ConfigError::MissingValue { ref key }) if key == KEY_DB_USERNAME
        ));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = database(Some("")).credentials().unwrap_err();
        assert!(matches!(err, StackError::Config(ConfigError::MissingValue { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", database(Some("admin")));
        assert!(!rendered.contains("s3cret"));
    }
}
