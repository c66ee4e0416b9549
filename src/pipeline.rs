//! The stack pipeline: configuration check, zone selection, subnet
//! planning, then topology assembly.
//!
//! Everything up to and including subnet planning happens in
//! [`StackPipeline::prepare`] and submits nothing; a failure there leaves
//! the engine untouched. [`StackPipeline::plan_network`] runs the zone and
//! subnet stages alone, for callers that only inspect placement. [`StackPlan::provision`] then declares the VPC
//! and hands the finished layout to the assembler.

use tracing::info;

use crate::config::StackConfig;
use crate::engine::{DryRunEngine, ProvisioningEngine};
use crate::error::Result;
use crate::state::DeclarationHasher;
use crate::topology::{
    DatabaseSettings, Declaration, NetworkBlock, ResourceSpec, Submission, SubnetLayout, TopologyAssembler,
    TopologyResult, Zone, ZoneSource, plan_subnets, select_zones,
};

/// Structural name of the VPC declaration.
pub const VPC_NAME: &str = "vpc";

/// Drives a planning run against a zone source.
pub struct StackPipeline<'a, Z: ZoneSource + ?Sized> {
    config: &'a StackConfig,
    zone_source: &'a Z,
}

/// Zones and subnets chosen for a run, before any database value is read.
#[derive(Debug, Clone)]
pub struct NetworkPlan {
    /// Address universe.
    pub block: NetworkBlock,
    /// Selected zones, in source order.
    pub zones: Vec<Zone>,
    /// Planned subnets.
    pub layout: SubnetLayout,
}

/// Output of the derivation stages, ready to be declared.
#[derive(Debug, Clone)]
pub struct StackPlan {
    /// Address universe.
    pub block: NetworkBlock,
    /// Assign DNS hostnames in the VPC.
    pub enable_dns_hostnames: bool,
    /// Selected zones, in source order.
    pub zones: Vec<Zone>,
    /// Planned subnets.
    pub layout: SubnetLayout,
    /// Database values.
    pub settings: DatabaseSettings,
}

/// Result of declaring a plan through an engine.
#[derive(Debug, Clone)]
pub struct StackRun {
    /// Engine the declarations went to.
    pub engine: &'static str,
    /// Zones the topology spans.
    pub zones: Vec<Zone>,
    /// The VPC declaration.
    pub vpc: Submission,
    /// Everything declared after the VPC.
    pub topology: TopologyResult,
}

impl<'a, Z: ZoneSource + ?Sized> StackPipeline<'a, Z> {
    /// Creates a pipeline for a configuration.
    #[must_use]
    pub const fn new(config: &'a StackConfig, zone_source: &'a Z) -> Self {
        Self { config, zone_source }
    }

    /// Runs every stage that precedes the first submission.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingValue` if a database value is absent,
    /// `ZoneError` if zones cannot be listed, and `PlanError` if the
    /// network block is invalid or too small.
    pub async fn prepare(&self) -> Result<StackPlan> {
        let settings = DatabaseSettings::from_config(&self.config.database)?;
        let NetworkPlan { block, zones, layout } = self.plan_network().await?;

        Ok(StackPlan {
            block,
            enable_dns_hostnames: self.config.network.enable_dns_hostnames,
            zones,
            layout,
            settings,
        })
    }

    /// Selects zones and plans subnets without touching database values.
    ///
    /// # Errors
    ///
    /// Returns `ZoneError` if zones cannot be listed and `PlanError` if the
    /// network block is invalid or too small.
    pub async fn plan_network(&self) -> Result<NetworkPlan> {
        let network = &self.config.network;

        let block = NetworkBlock::parse(&network.cidr_block)?;
        let zones = select_zones(self.zone_source, network.max_zones).await?;
        let layout = plan_subnets(&block, &zones)?;

        info!(
            "Planned {} subnets across {} zone(s) in {block}",
            layout.len(),
            zones.len()
        );

        Ok(NetworkPlan { block, zones, layout })
    }
}

impl StackPlan {
    /// Declares the VPC and the full topology through `engine`.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Provisioning` naming the first rejected
    /// declaration.
    pub async fn provision<E: ProvisioningEngine + ?Sized>(&self, engine: &E) -> Result<StackRun> {
        let declaration = Declaration::new(
            VPC_NAME,
            ResourceSpec::Vpc {
                cidr_block: self.block,
                enable_dns_hostnames: self.enable_dns_hostnames,
            },
        );
        let id = engine.submit(&declaration).await?;
        info!("VPC declared as {id}");

        let topology = TopologyAssembler::new(engine, &self.settings)
            .assemble(&id, &self.zones, &self.layout.private, &self.layout.public)
            .await?;

        Ok(StackRun {
            engine: engine.name(),
            zones: self.zones.clone(),
            vpc: Submission { declaration, id },
            topology,
        })
    }

    /// Declares the plan through the dry-run engine.
    ///
    /// # Errors
    ///
    /// Returns an error only if the layout is inconsistent.
    pub async fn preview(&self) -> Result<StackRun> {
        self.provision(&DryRunEngine::new()).await
    }
}

impl StackRun {
    /// Returns every submission in order, VPC first.
    pub fn submissions(&self) -> impl Iterator<Item = &Submission> {
        std::iter::once(&self.vpc).chain(self.topology.submissions.iter())
    }

    /// Returns every submission in order as an owned list.
    #[must_use]
    pub fn to_submissions(&self) -> Vec<Submission> {
        self.submissions().cloned().collect()
    }

    /// Returns every declaration in order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.submissions().map(|s| &s.declaration)
    }

    /// Returns the number of declarations submitted.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.topology.submissions.len()
    }

    /// Returns false; a run always declares at least the VPC.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Fingerprints the declaration set.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a declaration cannot be encoded.
    pub fn fingerprint(&self) -> Result<String> {
        DeclarationHasher::new().fingerprint(self.declarations())
    }
}
