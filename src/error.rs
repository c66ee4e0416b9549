//! Error types for the Aurora stack planner.
//!
//! Every failure is fatal to a planning run. The hierarchy mirrors the
//! pipeline stages: configuration, zone discovery, subnet planning,
//! provisioning, and manifest storage.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Aurora stack planner.
#[derive(Debug, Error)]
pub enum StackError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Availability zone discovery errors.
    #[error("Zone discovery error: {0}")]
    Zone(#[from] ZoneError),

    /// Address planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// The provisioning engine rejected a declaration.
    #[error("Provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    /// Manifest storage errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required externally supplied value is absent.
    #[error("Missing required configuration value: {key}")]
    MissingValue {
        /// Configuration key, e.g. `db-username`.
        key: String,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Availability zone discovery errors.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The zone source could not be reached.
    #[error("Availability zones unavailable in {region}: {message}")]
    Unavailable {
        /// Region that was queried.
        region: String,
        /// Description of the failure.
        message: String,
    },

    /// The zone source answered but listed no available zones.
    #[error("No available zones reported for {region}")]
    NoZones {
        /// Region that was queried.
        region: String,
    },
}

/// Address planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Partitioning would overflow the network block.
    #[error("Address space exhausted: {required} /24 blocks required, {available} available")]
    AddressSpaceExhausted {
        /// Number of /24 blocks the plan needs.
        required: usize,
        /// Number of /24 blocks the network block holds.
        available: usize,
    },

    /// The network block is not a usable IPv4 /16.
    #[error("Invalid network block '{cidr}': {reason}")]
    InvalidNetworkBlock {
        /// The offending CIDR string.
        cidr: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// The provisioning engine failed to accept or apply a declaration.
#[derive(Debug, Error)]
#[error("Failed to provision '{resource}': {cause}")]
pub struct ProvisioningError {
    /// Structural name of the offending declaration.
    pub resource: String,
    /// Cause reported by the engine, verbatim.
    pub cause: String,
}

/// Manifest storage errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// Manifest is corrupted.
    #[error("Manifest is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Local filesystem backend error.
    #[error("Local manifest backend error: {message}")]
    LocalError {
        /// Description of the filesystem error.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 manifest backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Serialization error.
    #[error("Manifest serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// Manifest version mismatch.
    #[error("Manifest version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected manifest version.
        expected: String,
        /// Found manifest version.
        found: String,
    },
}

/// Result type alias for Aurora stack operations.
pub type Result<T> = std::result::Result<T, StackError>;

impl StackError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the pipeline stage this error stopped the run at.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Zone(_) => "zone selection",
            Self::Plan(_) => "subnet planning",
            Self::Provisioning(_) => "topology assembly",
            Self::State(_) => "manifest storage",
            Self::Io(_) | Self::Internal(_) => "internal",
        }
    }

    /// Returns the resource that failed, for provisioning errors.
    #[must_use]
    pub fn failed_resource(&self) -> Option<&str> {
        match self {
            Self::Provisioning(e) => Some(e.resource.as_str()),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a missing-value error for a configuration key.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingValue { key: key.into() }
    }
}

impl ZoneError {
    /// Creates an unavailable error for a region.
    #[must_use]
    pub fn unavailable(region: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            region: region.into(),
            message: message.into(),
        }
    }
}

impl ProvisioningError {
    /// Creates a provisioning error for a named resource.
    #[must_use]
    pub fn new(resource: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            cause: cause.into(),
        }
    }
}

impl StateError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a local backend error with the given message.
    #[must_use]
    pub fn local(message: impl Into<String>) -> Self {
        Self::LocalError {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let err = StackError::from(ConfigError::missing("db-username"));
        assert_eq!(err.stage(), "configuration");

        let err = StackError::from(ZoneError::NoZones {
            region: String::from("us-east-1"),
        });
        assert_eq!(err.stage(), "zone selection");
    }

    #[test]
    fn test_provisioning_error_names_resource() {
        let err = StackError::from(ProvisioningError::new("igw", "quota exceeded"));
        assert_eq!(err.failed_resource(), Some("igw"));
        assert!(err.to_string().contains("'igw'"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
