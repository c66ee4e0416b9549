//! Configuration validation for stack configurations.
//!
//! Database credentials are deliberately not validated here beyond what
//! the planner needs: they are opaque and presence-checked at run time.

use crate::error::{ConfigError, Result, StackError};
use crate::topology::NetworkBlock;
use std::collections::HashSet;
use tracing::debug;

use super::spec::{EngineConfig, EngineKind, NetworkConfig, ProjectConfig, StackConfig, StateBackend, StateConfig};

/// Upper bound on the zone fan-out accepted from configuration.
pub const MAX_ZONE_FAN_OUT: usize = 128;

/// Validator for stack configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &StackConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_project(&config.project, &mut result);
        Self::validate_network(&config.network, config.project.region.as_deref(), &mut result);
        Self::validate_engine(&config.engine, &mut result);
        Self::validate_state(&config.state, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(StackError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Validates project configuration.
    fn validate_project(project: &ProjectConfig, result: &mut ValidationResult) {
        if project.name.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("project.name"),
                message: String::from("Project name cannot be empty"),
            });
        } else if !is_valid_name(&project.name) {
            result.errors.push(ValidationError {
                field: String::from("project.name"),
                message: format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.name
                ),
            });
        }

        if project.environment.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("project.environment"),
                message: String::from("Environment cannot be empty"),
            });
        }
    }

    /// Validates the network block and zone settings.
    fn validate_network(network: &NetworkConfig, region: Option<&str>, result: &mut ValidationResult) {
        if let Err(e) = NetworkBlock::parse(&network.cidr_block) {
            result.errors.push(ValidationError {
                field: String::from("network.cidr_block"),
                message: e.to_string(),
            });
        }

        if network.max_zones == 0 || network.max_zones > MAX_ZONE_FAN_OUT {
            result.errors.push(ValidationError {
                field: String::from("network.max_zones"),
                message: format!(
                    "max_zones must be between 1 and {MAX_ZONE_FAN_OUT}, got {}",
                    network.max_zones
                ),
            });
        }

        let mut seen = HashSet::new();
        for (i, zone) in network.zones.iter().enumerate() {
            if zone.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("network.zones[{i}]"),
                    message: String::from("Zone name cannot be empty"),
                });
            } else if !seen.insert(zone.as_str()) {
                result.errors.push(ValidationError {
                    field: format!("network.zones[{i}]"),
                    message: format!("Duplicate zone: {zone}"),
                });
            }

            if let Some(region) = region
                && !zone.starts_with(region)
            {
                result.warnings.push(format!(
                    "network.zones[{i}]: Zone '{zone}' does not belong to region '{region}'"
                ));
            }
        }

        if network.zones.len() > network.max_zones {
            result.warnings.push(format!(
                "network.zones: {} zones pinned but only the first {} are used",
                network.zones.len(),
                network.max_zones
            ));
        }
    }

    /// Validates engine configuration.
    fn validate_engine(engine: &EngineConfig, result: &mut ValidationResult) {
        if engine.kind == EngineKind::Http {
            match engine.url.as_deref() {
                None | Some("") => result.errors.push(ValidationError {
                    field: String::from("engine.url"),
                    message: String::from("Engine URL is required when using the http engine"),
                }),
                Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    result.errors.push(ValidationError {
                        field: String::from("engine.url"),
                        message: format!("Engine URL must be http(s): {url}"),
                    });
                }
                Some(_) => {}
            }
        }

        if engine.timeout_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("engine.timeout_secs"),
                message: String::from("Engine timeout must be at least 1 second"),
            });
        }
    }

    /// Validates manifest backend configuration.
    fn validate_state(state: &StateConfig, result: &mut ValidationResult) {
        match state.backend {
            StateBackend::S3 => {
                if state.bucket.as_ref().is_none_or(String::is_empty) {
                    result.errors.push(ValidationError {
                        field: String::from("state.bucket"),
                        message: String::from("S3 bucket name is required when using S3 backend"),
                    });
                }
            }
            StateBackend::Local => {}
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.ends_with('-')
        && !name.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn config(yaml: &str) -> StackConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("aurora-demo"));
        assert!(is_valid_name("stack-123"));
        assert!(is_valid_name("a"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Aurora")); // uppercase
        assert!(!is_valid_name("1-stack")); // starts with number
        assert!(!is_valid_name("aurora_demo")); // underscore
        assert!(!is_valid_name("aurora-")); // ends with hyphen
        assert!(!is_valid_name("aurora--demo")); // consecutive hyphens
    }

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new()
            .validate(&config("project:\n  name: aurora-demo\n"))
            .unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_rejects_non_slash_16_block() {
        let cfg = config("project:\n  name: aurora-demo\nnetwork:\n  cidr_block: 10.0.0.0/20\n");
        assert!(ConfigValidator::new().validate(&cfg).is_err());
    }

    #[test]
    fn test_rejects_zero_zones() {
        let cfg = config("project:\n  name: aurora-demo\nnetwork:\n  max_zones: 0\n");
        assert!(ConfigValidator::new().validate(&cfg).is_err());
    }

    #[test]
    fn test_http_engine_requires_url() {
        let cfg = config("project:\n  name: aurora-demo\nengine:\n  kind: http\n");
        let err = ConfigValidator::new().validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("Engine URL"));
    }

    #[test]
    fn test_s3_requires_bucket() {
        let cfg = config("project:\n  name: aurora-demo\nstate:\n  backend: s3\n");
        assert!(ConfigValidator::new().validate(&cfg).is_err());
    }

    #[test]
    fn test_foreign_zone_warns() {
        let cfg = config(
            "project:\n  name: aurora-demo\n  region: us-east-1\nnetwork:\n  zones: [us-east-1a, eu-west-1a]\n",
        );
        let result = ConfigValidator::new().validate(&cfg).unwrap();
        assert_eq!(result.warning_count(), 1);
    }
}
