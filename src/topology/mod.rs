//! Topology derivation: zones, subnets, and the declarations built from them.
//!
//! Stages run strictly forward:
//!
//! 1. [`select_zones`] picks the availability zones
//! 2. [`plan_subnets`] partitions the network block per zone and tier
//! 3. [`TopologyAssembler`] declares routing, subnets and the database

mod assembler;
mod declaration;
mod model;
mod network;
mod subnets;
mod zones;

pub use assembler::{
    CLUSTER_NAME, DEFAULT_ROUTE_NAME, DatabaseSettings, ENGINE_VERSION_OUTPUT, GATEWAY_NAME, INSTANCE_NAME,
    ROUTE_TABLE_NAME, SUBNET_GROUP_NAME, Submission, TopologyAssembler, TopologyResult,
};
pub use declaration::{DEFAULT_ROUTE_CIDR, Declaration, OutputRef, REDACTED, ResourceSpec, Secret, Tags, tags};
pub use model::{
    ClusterPlan, InstancePlan, ProvisionedSubnet, ResourceId, RouteAssociation, RoutingPlan, SubnetGroup,
    SubnetPlan, Tier, Zone,
};
pub use network::{NetworkBlock, SubnetCidr};
pub use subnets::{SubnetLayout, plan_subnets};
pub use zones::{DEFAULT_MAX_ZONES, Ec2ZoneSource, StaticZoneSource, ZoneSource, select_zones};
