//! Provisioning engine integration.
//!
//! The engine owns everything past declaration: diffing against live
//! state, apply ordering, retries. This crate only submits declarations
//! and keeps the identifiers it gets back.

mod dry_run;
mod http;

use async_trait::async_trait;

use crate::error::ProvisioningError;
use crate::topology::{Declaration, ResourceId};

pub use dry_run::DryRunEngine;
pub use http::HttpEngine;

/// Capability to submit declarations to a provisioning engine.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Submits one declaration and returns the identifier the engine assigned.
    ///
    /// Implementations must not retry; failures are reported as-is.
    async fn submit(&self, declaration: &Declaration) -> Result<ResourceId, ProvisioningError>;

    /// Engine name for logs and manifests.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl ProvisioningEngine for Box<dyn ProvisioningEngine> {
    async fn submit(&self, declaration: &Declaration) -> Result<ResourceId, ProvisioningError> {
        (**self).submit(declaration).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
