//! Topology assembler: turns a finished subnet layout into declarations.
//!
//! Declarations are submitted one at a time, in construction order, so
//! every identifier a declaration references was handed out by the engine
//! before that declaration is built.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DatabaseConfig, DatabaseCredentials};
use crate::engine::ProvisioningEngine;
use crate::error::{Result, StackError};

use super::declaration::{DEFAULT_ROUTE_CIDR, Declaration, OutputRef, ResourceSpec, Secret, tags};
use super::model::{
    ClusterPlan, InstancePlan, ProvisionedSubnet, ResourceId, RouteAssociation, RoutingPlan, SubnetGroup,
    SubnetPlan, Zone,
};

/// Structural name of the internet gateway.
pub const GATEWAY_NAME: &str = "igw";
/// Structural name of the public route table.
pub const ROUTE_TABLE_NAME: &str = "public-route-table";
/// Structural name of the public default route.
pub const DEFAULT_ROUTE_NAME: &str = "public-default-route";
/// Structural name of the database subnet group.
pub const SUBNET_GROUP_NAME: &str = "aurora-subnet-group";
/// Structural name of the database cluster.
pub const CLUSTER_NAME: &str = "aurora-postgre-sql-cluster";
/// Structural name of the cluster instance.
pub const INSTANCE_NAME: &str = "cluster-instance";
/// Cluster output the instance inherits its engine version from.
pub const ENGINE_VERSION_OUTPUT: &str = "engineVersion";

/// A declaration together with the identifier the engine assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The submitted declaration.
    pub declaration: Declaration,
    /// Identifier returned by the engine.
    pub id: ResourceId,
}

/// Database values the assembler needs besides the layout.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Cluster identifier.
    pub cluster_identifier: String,
    /// Initial database name.
    pub database_name: String,
    /// Instance identifier.
    pub instance_identifier: String,
    /// Database engine.
    pub engine: String,
    /// Externally supplied values.
    pub credentials: DatabaseCredentials,
}

/// Everything the assembler declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyResult {
    /// Internet gateway.
    pub gateway_id: ResourceId,
    /// Public routing.
    pub routing: RoutingPlan,
    /// Private subnets, index-aligned with the zones.
    pub private_subnets: Vec<ProvisionedSubnet>,
    /// Public subnets, index-aligned with the zones.
    pub public_subnets: Vec<ProvisionedSubnet>,
    /// Database subnet group.
    pub subnet_group: SubnetGroup,
    /// Database cluster.
    pub cluster: ClusterPlan,
    /// Cluster instance.
    pub instance: InstancePlan,
    /// Every submission, in order.
    pub submissions: Vec<Submission>,
}

/// Declares the network and database topology through an engine.
pub struct TopologyAssembler<'a, E: ProvisioningEngine + ?Sized> {
    engine: &'a E,
    settings: &'a DatabaseSettings,
}

/// Ordered record of what has been submitted so far.
struct Ledger<'a, E: ProvisioningEngine + ?Sized> {
    engine: &'a E,
    submissions: Vec<Submission>,
}

impl DatabaseSettings {
    /// Builds settings from configuration, checking the required values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingValue` if a required value is absent.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            cluster_identifier: config.cluster_identifier.clone(),
            database_name: config.database_name.clone(),
            instance_identifier: config.instance_identifier.clone(),
            engine: config.engine.clone(),
            credentials: config.credentials()?,
        })
    }
}

impl<'a, E: ProvisioningEngine + ?Sized> Ledger<'a, E> {
    const fn new(engine: &'a E) -> Self {
        Self {
            engine,
            submissions: Vec::new(),
        }
    }

    async fn declare(&mut self, name: impl Into<String>, spec: ResourceSpec) -> Result<ResourceId> {
        let declaration = Declaration::new(name, spec);
        debug!("Submitting {} '{}'", declaration.kind(), declaration.name);

        let id = self.engine.submit(&declaration).await?;
        self.submissions.push(Submission {
            declaration,
            id: id.clone(),
        });
        Ok(id)
    }
}

impl<'a, E: ProvisioningEngine + ?Sized> TopologyAssembler<'a, E> {
    /// Creates an assembler submitting through `engine`.
    #[must_use]
    pub const fn new(engine: &'a E, settings: &'a DatabaseSettings) -> Self {
        Self { engine, settings }
    }

    /// Declares gateway, routing, subnets, subnet group, cluster and instance.
    ///
    /// `private` and `public` must come from the same subnet layout as
    /// `zones`.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Provisioning` naming the first declaration the
    /// engine rejected; nothing after it is submitted. Returns an internal
    /// error if the layout does not match `zones`.
    pub async fn assemble(
        &self,
        vpc: &ResourceId,
        zones: &[Zone],
        private: &[SubnetPlan],
        public: &[SubnetPlan],
    ) -> Result<TopologyResult> {
        check_layout(zones, private, public)?;
        info!(
            "Assembling topology across {} zone(s) via {} engine",
            zones.len(),
            self.engine.name()
        );

        let mut ledger = Ledger::new(self.engine);

        let gateway_id = ledger
            .declare(
                GATEWAY_NAME,
                ResourceSpec::InternetGateway {
                    vpc_id: vpc.clone(),
                    tags: tags([("Name", "Aurora Cluster Internet Gateway")]),
                },
            )
            .await?;

        let route_table_id = ledger
            .declare(ROUTE_TABLE_NAME, ResourceSpec::RouteTable { vpc_id: vpc.clone() })
            .await?;

        let default_route_id = ledger
            .declare(
                DEFAULT_ROUTE_NAME,
                ResourceSpec::Route {
                    route_table_id: route_table_id.clone(),
                    destination_cidr_block: DEFAULT_ROUTE_CIDR.to_string(),
                    gateway_id: gateway_id.clone(),
                },
            )
            .await?;

        let mut private_subnets = Vec::with_capacity(private.len());
        for plan in private {
            let id = ledger.declare(plan.resource_name(), subnet_spec(vpc, plan)).await?;
            private_subnets.push(ProvisionedSubnet {
                plan: plan.clone(),
                id,
            });
        }

        let mut public_subnets = Vec::with_capacity(public.len());
        let mut associations = Vec::with_capacity(public.len());
        for plan in public {
            let subnet_id = ledger.declare(plan.resource_name(), subnet_spec(vpc, plan)).await?;
            let id = ledger
                .declare(
                    format!("{ROUTE_TABLE_NAME}-association-{}", plan.index),
                    ResourceSpec::RouteTableAssociation {
                        subnet_id: subnet_id.clone(),
                        route_table_id: route_table_id.clone(),
                    },
                )
                .await?;

            associations.push(RouteAssociation {
                subnet_id: subnet_id.clone(),
                route_table_id: route_table_id.clone(),
                id,
            });
            public_subnets.push(ProvisionedSubnet {
                plan: plan.clone(),
                id: subnet_id,
            });
        }

        let members: Vec<ResourceId> = private_subnets.iter().map(|s| s.id.clone()).collect();
        let group_id = ledger
            .declare(
                SUBNET_GROUP_NAME,
                ResourceSpec::DbSubnetGroup {
                    subnet_ids: members.clone(),
                    tags: tags([("Name", "Aurora subnet group")]),
                },
            )
            .await?;

        let cluster_zones: Vec<Zone> = private_subnets.iter().map(|s| s.plan.zone.clone()).collect();
        let settings = self.settings;
        let cluster_id = ledger
            .declare(
                CLUSTER_NAME,
                ResourceSpec::DbCluster {
                    cluster_identifier: settings.cluster_identifier.clone(),
                    database_name: settings.database_name.clone(),
                    engine: settings.engine.clone(),
                    availability_zones: cluster_zones.clone(),
                    master_username: settings.credentials.username.clone(),
                    master_password: Secret::new(settings.credentials.password.clone()),
                    db_subnet_group_name: group_id.clone(),
                    skip_final_snapshot: true,
                },
            )
            .await?;

        let instance_id = ledger
            .declare(
                INSTANCE_NAME,
                ResourceSpec::DbClusterInstance {
                    identifier: settings.instance_identifier.clone(),
                    cluster_identifier: cluster_id.clone(),
                    instance_class: settings.credentials.instance_class.clone(),
                    engine: settings.engine.clone(),
                    engine_version: OutputRef {
                        from: cluster_id.clone(),
                        output: ENGINE_VERSION_OUTPUT.to_string(),
                    },
                    db_subnet_group_name: group_id.clone(),
                },
            )
            .await?;

        info!(
            "Declared {} resources; cluster {cluster_id} with instance {instance_id}",
            ledger.submissions.len()
        );

        Ok(TopologyResult {
            gateway_id,
            routing: RoutingPlan {
                route_table_id,
                default_route_id,
                associations,
            },
            private_subnets,
            public_subnets,
            subnet_group: SubnetGroup {
                id: group_id.clone(),
                members,
            },
            cluster: ClusterPlan {
                id: cluster_id.clone(),
                cluster_identifier: settings.cluster_identifier.clone(),
                engine: settings.engine.clone(),
                database_name: settings.database_name.clone(),
                master_username: settings.credentials.username.clone(),
                zones: cluster_zones,
                subnet_group: group_id.clone(),
                skip_final_snapshot: true,
            },
            instance: InstancePlan {
                id: instance_id,
                identifier: settings.instance_identifier.clone(),
                cluster: cluster_id,
                subnet_group: group_id,
                instance_class: settings.credentials.instance_class.clone(),
            },
            submissions: ledger.submissions,
        })
    }
}

fn subnet_spec(vpc: &ResourceId, plan: &SubnetPlan) -> ResourceSpec {
    let name = plan.name_tag();
    ResourceSpec::Subnet {
        vpc_id: vpc.clone(),
        cidr_block: plan.cidr,
        availability_zone: plan.zone.clone(),
        tags: tags([("Name", name.as_str()), ("Tier", plan.tier.as_str())]),
    }
}

fn check_layout(zones: &[Zone], private: &[SubnetPlan], public: &[SubnetPlan]) -> Result<()> {
    if private.is_empty() {
        return Err(StackError::internal("cannot place a cluster without private subnets"));
    }
    let aligned = |plans: &[SubnetPlan]| plans.iter().map(|p| &p.zone).eq(zones.iter());
    if !aligned(private) || !aligned(public) {
        return Err(StackError::internal("subnet layout does not match the selected zones"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DryRunEngine;
    use crate::error::ProvisioningError;
    use crate::topology::{NetworkBlock, plan_subnets};
    use async_trait::async_trait;
    use mockall::mock;
    use std::collections::HashSet;

    mock! {
        Engine {}

        #[async_trait]
        impl ProvisioningEngine for Engine {
            async fn submit(&self, declaration: &Declaration) -> std::result::Result<ResourceId, ProvisioningError>;
            fn name(&self) -> &'static str;
        }
    }

    fn settings() -> DatabaseSettings {
        DatabaseSettings::from_config(&DatabaseConfig {
            username: Some(String::from("admin")),
            password: Some(String::from("hunter2")),
            instance_class: Some(String::from("db.r6g.large")),
            ..DatabaseConfig::default()
        })
        .unwrap()
    }

    fn zones(names: &[&str]) -> Vec<Zone> {
        names.iter().map(|n| Zone::new(*n)).collect()
    }

    async fn assemble(names: &[&str]) -> TopologyResult {
        let zones = zones(names);
        let layout = plan_subnets(&NetworkBlock::default(), &zones).unwrap();
        let settings = settings();
        TopologyAssembler::new(&DryRunEngine::new(), &settings)
            .assemble(&ResourceId::new("vpc-1"), &zones, &layout.private, &layout.public)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_three_zone_topology() {
        let result = assemble(&["a", "b", "c"]).await;

        assert_eq!(result.private_subnets.len(), 3);
        assert_eq!(result.public_subnets.len(), 3);
        assert_eq!(result.routing.associations.len(), 3);
        for (assoc, subnet) in result.routing.associations.iter().zip(&result.public_subnets) {
            assert_eq!(assoc.subnet_id, subnet.id);
            assert_eq!(assoc.route_table_id, result.routing.route_table_id);
        }

        let private_ids: Vec<_> = result.private_subnets.iter().map(|s| s.id.clone()).collect();
        assert_eq!(result.subnet_group.members, private_ids);
        assert_eq!(result.cluster.zones, zones(&["a", "b", "c"]));
        assert_eq!(result.cluster.subnet_group, result.subnet_group.id);
        assert!(result.cluster.skip_final_snapshot);
        assert_eq!(result.instance.cluster, result.cluster.id);
        assert_eq!(result.instance.instance_class, "db.r6g.large");
        assert_eq!(result.submissions.len(), 15);
    }

    #[tokio::test]
    async fn test_single_zone_topology() {
        let result = assemble(&["a"]).await;

        assert_eq!(result.private_subnets[0].plan.cidr.to_string(), "10.0.0.0/24");
        assert_eq!(result.public_subnets[0].plan.cidr.to_string(), "10.0.1.0/24");
        assert_eq!(result.routing.associations.len(), 1);
        assert_eq!(result.subnet_group.members.len(), 1);
        assert_eq!(result.cluster.zones, zones(&["a"]));
    }

    #[tokio::test]
    async fn test_references_precede_use() {
        let result = assemble(&["a", "b", "c"]).await;

        let mut known: HashSet<ResourceId> = HashSet::from([ResourceId::new("vpc-1")]);
        for submission in &result.submissions {
            for reference in submission.declaration.spec.references() {
                assert!(
                    known.contains(reference),
                    "'{}' references {reference} before it exists",
                    submission.declaration.name
                );
            }
            known.insert(submission.id.clone());
        }
    }

    #[tokio::test]
    async fn test_private_subnets_are_not_associated() {
        let result = assemble(&["a", "b"]).await;
        let associated: HashSet<_> = result.routing.associations.iter().map(|a| &a.subnet_id).collect();
        assert!(result.private_subnets.iter().all(|s| !associated.contains(&s.id)));
    }

    #[tokio::test]
    async fn test_instance_inherits_engine_version() {
        let result = assemble(&["a"]).await;
        let instance = result.submissions.last().unwrap();

        match &instance.declaration.spec {
            ResourceSpec::DbClusterInstance { engine_version, .. } => {
                assert_eq!(engine_version.from, result.cluster.id);
                assert_eq!(engine_version.output, ENGINE_VERSION_OUTPUT);
            }
            other => panic!("unexpected last declaration: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_assembly_is_idempotent() {
        let first = assemble(&["a", "b", "c"]).await;
        let second = assemble(&["a", "b", "c"]).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_engine_failure_stops_assembly() {
        let mut engine = MockEngine::new();
        engine.expect_name().return_const("mock");
        engine.expect_submit().times(4).returning(|declaration| {
            if declaration.name == "private-subnet-0" {
                Err(ProvisioningError::new(&declaration.name, "InsufficientFreeAddresses"))
            } else {
                Ok(ResourceId::new(format!("id-{}", declaration.name)))
            }
        });

        let zones = zones(&["a", "b"]);
        let layout = plan_subnets(&NetworkBlock::default(), &zones).unwrap();
        let settings = settings();
        let err = TopologyAssembler::new(&engine, &settings)
            .assemble(&ResourceId::new("vpc-1"), &zones, &layout.private, &layout.public)
            .await
            .unwrap_err();

        assert_eq!(err.failed_resource(), Some("private-subnet-0"));
        assert_eq!(err.stage(), "topology assembly");
    }

    #[tokio::test]
    async fn test_mismatched_layout_is_rejected() {
        let layout = plan_subnets(&NetworkBlock::default(), &zones(&["a", "b"])).unwrap();
        let settings = settings();
        let err = TopologyAssembler::new(&DryRunEngine::new(), &settings)
            .assemble(&ResourceId::new("vpc-1"), &zones(&["a"]), &layout.private, &layout.public)
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::Internal(_)));
    }
}
