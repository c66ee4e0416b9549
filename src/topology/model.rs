//! Entities derived during a planning run.
//!
//! Every value here is created once per run and never mutated afterwards.
//! Identifiers handed back by the provisioning engine are kept opaque.

use serde::{Deserialize, Serialize};

use super::network::SubnetCidr;

/// An availability zone name, e.g. `us-east-1a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zone(String);

/// An identifier generated by the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

/// Subnet tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Database placement tier, no internet route.
    Private,
    /// Tier routed through the internet gateway.
    Public,
}

/// One planned subnet: a (tier, zone) pair and its address range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetPlan {
    /// Tier of the subnet.
    pub tier: Tier,
    /// Position within its tier, aligned with the zone list.
    pub index: usize,
    /// Zone the subnet is placed in.
    pub zone: Zone,
    /// Address range.
    pub cidr: SubnetCidr,
}

/// A subnet the engine has accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedSubnet {
    /// The plan the subnet was declared from.
    pub plan: SubnetPlan,
    /// Engine identifier.
    pub id: ResourceId,
}

/// Public routing: one table, one default route, one association per public subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPlan {
    /// Public route table.
    pub route_table_id: ResourceId,
    /// Default route through the internet gateway.
    pub default_route_id: ResourceId,
    /// Associations, index-aligned with the public subnets.
    pub associations: Vec<RouteAssociation>,
}

/// Binding of one public subnet to the public route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAssociation {
    /// Associated subnet.
    pub subnet_id: ResourceId,
    /// Route table the subnet is bound to.
    pub route_table_id: ResourceId,
    /// Engine identifier of the association.
    pub id: ResourceId,
}

/// Database placement scope: the private subnets, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    /// Engine identifier of the group.
    pub id: ResourceId,
    /// Member subnet identifiers.
    pub members: Vec<ResourceId>,
}

/// The declared database cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPlan {
    /// Engine identifier of the cluster.
    pub id: ResourceId,
    /// Cluster identifier.
    pub cluster_identifier: String,
    /// Database engine.
    pub engine: String,
    /// Initial database name.
    pub database_name: String,
    /// Master username.
    pub master_username: String,
    /// Zones, equal to the private subnet zones in order.
    pub zones: Vec<Zone>,
    /// Subnet group the cluster is placed in.
    pub subnet_group: ResourceId,
    /// Skip the final snapshot on teardown.
    pub skip_final_snapshot: bool,
}

/// The single declared cluster instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePlan {
    /// Engine identifier of the instance.
    pub id: ResourceId,
    /// Instance identifier.
    pub identifier: String,
    /// Cluster the instance belongs to.
    pub cluster: ResourceId,
    /// Subnet group the instance is placed in.
    pub subnet_group: ResourceId,
    /// Instance class.
    pub instance_class: String,
}

impl Zone {
    /// Creates a zone from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the zone name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ResourceId {
    /// Wraps an engine-generated identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as handed out by the engine.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Tier {
    /// Returns the tier label used in names and tags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl SubnetPlan {
    /// Returns the structural name of the subnet declaration.
    #[must_use]
    pub fn resource_name(&self) -> String {
        format!("{}-subnet-{}", self.tier, self.index)
    }

    /// Returns the `Name` tag of the subnet.
    #[must_use]
    pub fn name_tag(&self) -> String {
        format!("aurora-{}-subnet-{}", self.tier, self.index)
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Zone {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
