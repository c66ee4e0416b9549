// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Aurora Stack
//!
//! Derives a VPC and a multi-AZ Aurora-PostgreSQL cluster from a handful of
//! inputs and submits the resulting declarations to a provisioning engine.
//!
//! ## Overview
//!
//! The crate owns the topology derivation; the engine owns everything past
//! declaration (diffing against the live account, ordering, retries).
//!
//! 1. **Zone selection**: the first `max_zones` available zones, in order
//! 2. **Subnet planning**: one private and one public /24 per zone
//! 3. **Topology assembly**: gateway, public routing, subnets, subnet
//!    group, cluster and a single cluster instance
//!
//! Every stage is fatal on failure. Nothing is submitted until the
//! database values are present, zones are known and the address plan fits.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`topology`]: Zone selection, subnet planning and declarations
//! - [`engine`]: Provisioning engines (dry run, HTTP)
//! - [`pipeline`]: Stage orchestration
//! - [`state`]: Manifest storage backends (local, S3)
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: billing
//!   environment: prod
//!   region: us-east-1
//!
//! network:
//!   cidr_block: 10.0.0.0/16
//!   max_zones: 3
//!
//! database:
//!   instance_class: db.r6g.large
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod topology;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, StackConfig};
pub use engine::{DryRunEngine, HttpEngine, ProvisioningEngine};
pub use error::{Result, StackError};
pub use pipeline::{NetworkPlan, StackPipeline, StackPlan, StackRun};
pub use state::{LocalManifestStore, ManifestStore, S3ManifestStore, StackManifest};
pub use topology::{Declaration, NetworkBlock, ResourceId, SubnetLayout, TopologyAssembler, Zone, ZoneSource};
