//! Configuration parser for loading stack configuration.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, StackError};
use std::path::Path;
use tracing::{debug, info};

use super::spec::StackConfig;

/// Configuration parser for loading stack configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StackError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StackConfig> {
        debug!("Parsing YAML configuration");

        let config: StackConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StackError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed configuration for project: {}", config.project.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Secrets are normally supplied this way rather than committed to
    /// the YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies environment overrides using the given variable lookup.
    pub fn apply_env_overrides(config: &mut StackConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup("AURORA_DB_USERNAME") {
            debug!("Overriding database.username from environment");
            config.database.username = Some(username);
        }

        if let Some(password) = lookup("AURORA_DB_PASSWORD") {
            debug!("Overriding database.password from environment");
            config.database.password = Some(password);
        }

        if let Some(class) = lookup("AURORA_DB_INSTANCE_CLASS") {
            debug!("Overriding database.instance_class from environment");
            config.database.instance_class = Some(class);
        }

        if let Some(region) = lookup("AURORA_PROJECT_REGION") {
            debug!("Overriding project.region from environment");
            config.project.region = Some(region);
        }

        if let Some(url) = lookup("AURORA_ENGINE_URL") {
            debug!("Overriding engine.url from environment");
            config.engine.url = Some(url);
        }

        if let Some(bucket) = lookup("AURORA_STATE_BUCKET") {
            debug!("Overriding state.bucket from environment");
            config.state.bucket = Some(bucket);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads the engine bearer token from the named environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is not set.
    pub fn get_engine_token(var: &str) -> Result<String> {
        std::env::var(var).map_err(|_| {
            StackError::Config(ConfigError::MissingEnvVar {
                name: var.to_string(),
            })
        })
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "aurora.stack.yaml",
    "aurora.stack.yml",
    "stack.yaml",
    "stack.yml",
];

/// Finds the configuration file in `start_dir` or one of its parents.
///
/// A relative `start_dir` is resolved against the working directory first,
/// so `"."` searches every ancestor of the working directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found or the working
/// directory cannot be determined.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = std::path::absolute(start_dir.as_ref())?;
    let mut current = start.clone();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::{EngineKind, StateBackend};

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
project:
  name: aurora-demo
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.name, "aurora-demo");
        assert_eq!(config.project.environment, "dev");
        assert_eq!(config.network.cidr_block, "10.0.0.0/16");
        assert_eq!(config.network.max_zones, 3);
        assert!(config.network.enable_dns_hostnames);
        assert_eq!(config.database.engine, "aurora-postgresql");
        assert_eq!(config.engine.kind, EngineKind::DryRun);
        assert_eq!(config.state.backend, StateBackend::Local);
        assert!(config.database.username.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
project:
  name: aurora-demo
  environment: prod
  region: eu-west-1

network:
  cidr_block: "10.20.0.0/16"
  max_zones: 2
  zones: [eu-west-1a, eu-west-1b]

database:
  username: admin
  instance_class: db.r6g.large
  database_name: orders

engine:
  kind: http
  url: https://engine.internal
  timeout_secs: 10

state:
  backend: s3
  bucket: aurora-state
  prefix: demo/prod
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.network.zones.len(), 2);
        assert_eq!(config.database.database_name, "orders");
        assert_eq!(config.database.cluster_identifier, "aurorapostgresql");
        assert_eq!(config.engine.kind, EngineKind::Http);
        assert_eq!(config.engine.timeout_secs, 10);
        assert_eq!(config.state.backend, StateBackend::S3);
    }

    #[test]
    fn test_invalid_yaml() {
        let parser = ConfigParser::new();
        assert!(parser.parse_yaml("project: [", None).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let parser = ConfigParser::new();
        let mut config = parser
            .parse_yaml("project:\n  name: aurora-demo\n", None)
            .unwrap();

        ConfigParser::apply_env_overrides(&mut config, |name| match name {
            "AURORA_DB_USERNAME" => Some(String::from("admin")),
            "AURORA_DB_PASSWORD" => Some(String::from("pw")),
            "AURORA_PROJECT_REGION" => Some(String::from("us-west-2")),
            _ => None,
        });

        assert_eq!(config.database.username.as_deref(), Some("admin"));
        assert_eq!(config.database.password.as_deref(), Some("pw"));
        assert!(config.database.instance_class.is_none());
        assert_eq!(config.project.region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_find_config_file_from_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("infra").join("db");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("aurora.stack.yaml"), "project:\n  name: x\n").unwrap();

        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();
        let found = find_config_file(".");
        std::env::set_current_dir(original).unwrap();

        let found = found.unwrap();
        assert!(found.is_absolute());
        assert_eq!(
            found.canonicalize().unwrap(),
            dir.path().join("aurora.stack.yaml").canonicalize().unwrap()
        );
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("aurora.stack.yaml"), "project:\n  name: x\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("aurora.stack.yaml"));
    }
}
