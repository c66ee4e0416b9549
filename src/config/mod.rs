//! Configuration module for the stack planner.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `aurora.stack.yaml`
//! - Environment overrides for externally supplied values
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{
    DatabaseConfig, DatabaseCredentials, EngineConfig, EngineKind, KEY_DB_INSTANCE_CLASS, KEY_DB_PASSWORD,
    KEY_DB_USERNAME, NetworkConfig, ProjectConfig, StackConfig, StateBackend, StateConfig,
};
pub use validator::{ConfigValidator, MAX_ZONE_FAN_OUT, ValidationError, ValidationResult};
