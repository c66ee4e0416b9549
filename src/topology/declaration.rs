//! Resource declarations submitted to the provisioning engine.
//!
//! A declaration is a structural name plus a typed property set. The wire
//! form is `{"name": ..., "kind": ..., "properties": {...}}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::model::{ResourceId, Zone};
use super::network::{NetworkBlock, SubnetCidr};

/// Destination of the public default route.
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Resource tags, ordered for stable serialization.
pub type Tags = BTreeMap<String, String>;

/// A named resource declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Structural name, unique within a run.
    pub name: String,
    /// Resource kind and properties.
    #[serde(flatten)]
    pub spec: ResourceSpec,
}

/// Properties of each declarable resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "properties", rename_all = "snake_case")]
pub enum ResourceSpec {
    /// The VPC.
    Vpc {
        /// Address universe.
        cidr_block: NetworkBlock,
        /// Assign DNS hostnames to instances.
        enable_dns_hostnames: bool,
    },
    /// Internet gateway attached to the VPC.
    InternetGateway {
        /// Owning VPC.
        vpc_id: ResourceId,
        /// Tags.
        tags: Tags,
    },
    /// A subnet in one zone.
    Subnet {
        /// Owning VPC.
        vpc_id: ResourceId,
        /// Address range.
        cidr_block: SubnetCidr,
        /// Zone placement.
        availability_zone: Zone,
        /// Tags, including the tier.
        tags: Tags,
    },
    /// A route table on the VPC.
    RouteTable {
        /// Owning VPC.
        vpc_id: ResourceId,
    },
    /// A route in a route table.
    Route {
        /// Route table the route belongs to.
        route_table_id: ResourceId,
        /// Destination range.
        destination_cidr_block: String,
        /// Gateway the traffic leaves through.
        gateway_id: ResourceId,
    },
    /// Binding of a subnet to a route table.
    RouteTableAssociation {
        /// Associated subnet.
        subnet_id: ResourceId,
        /// Route table.
        route_table_id: ResourceId,
    },
    /// Database subnet group.
    DbSubnetGroup {
        /// Member subnets, in order.
        subnet_ids: Vec<ResourceId>,
        /// Tags.
        tags: Tags,
    },
    /// Database cluster.
    DbCluster {
        /// Cluster identifier.
        cluster_identifier: String,
        /// Initial database name.
        database_name: String,
        /// Database engine.
        engine: String,
        /// Zones for replica placement, in order.
        availability_zones: Vec<Zone>,
        /// Master username.
        master_username: String,
        /// Master password.
        master_password: Secret,
        /// Subnet group the cluster is placed in.
        db_subnet_group_name: ResourceId,
        /// Skip the final snapshot on teardown.
        skip_final_snapshot: bool,
    },
    /// Instance of a database cluster.
    DbClusterInstance {
        /// Instance identifier.
        identifier: String,
        /// Owning cluster.
        cluster_identifier: ResourceId,
        /// Instance class.
        instance_class: String,
        /// Database engine.
        engine: String,
        /// Engine version, resolved from the cluster by the engine.
        engine_version: OutputRef,
        /// Subnet group the instance is placed in.
        db_subnet_group_name: ResourceId,
    },
}

/// Reference to an output of another declaration, resolved at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    /// Resource whose output is referenced.
    pub from: ResourceId,
    /// Output attribute name.
    pub output: String,
}

/// A secret value. Serialized verbatim for the engine; never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

/// Placeholder written wherever a secret is redacted.
pub const REDACTED: &str = "********";

impl Declaration {
    /// Creates a declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, spec: ResourceSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }

    /// Returns the resource kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.spec.kind()
    }

    /// Returns a copy with every secret replaced by [`REDACTED`].
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let ResourceSpec::DbCluster { master_password, .. } = &mut copy.spec {
            *master_password = Secret::new(REDACTED);
        }
        copy
    }
}

impl ResourceSpec {
    /// Returns the snake-case kind name, as used on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Vpc { .. } => "vpc",
            Self::InternetGateway { .. } => "internet_gateway",
            Self::Subnet { .. } => "subnet",
            Self::RouteTable { .. } => "route_table",
            Self::Route { .. } => "route",
            Self::RouteTableAssociation { .. } => "route_table_association",
            Self::DbSubnetGroup { .. } => "db_subnet_group",
            Self::DbCluster { .. } => "db_cluster",
            Self::DbClusterInstance { .. } => "db_cluster_instance",
        }
    }

    /// Returns the short prefix AWS uses for identifiers of this kind.
    #[must_use]
    pub const fn id_prefix(&self) -> &'static str {
        match self {
            Self::Vpc { .. } => "vpc",
            Self::InternetGateway { .. } => "igw",
            Self::Subnet { .. } => "subnet",
            Self::RouteTable { .. } => "rtb",
            Self::Route { .. } => "r",
            Self::RouteTableAssociation { .. } => "rtbassoc",
            Self::DbSubnetGroup { .. } => "dbsubnet",
            Self::DbCluster { .. } => "cluster",
            Self::DbClusterInstance { .. } => "db",
        }
    }

    /// Returns the identifiers this declaration references.
    #[must_use]
    pub fn references(&self) -> Vec<&ResourceId> {
        match self {
            Self::Vpc { .. } => vec![],
            Self::InternetGateway { vpc_id, .. }
            | Self::Subnet { vpc_id, .. }
            | Self::RouteTable { vpc_id } => vec![vpc_id],
            Self::Route {
                route_table_id,
                gateway_id,
                ..
            } => vec![route_table_id, gateway_id],
            Self::RouteTableAssociation {
                subnet_id,
                route_table_id,
            } => vec![subnet_id, route_table_id],
            Self::DbSubnetGroup { subnet_ids, .. } => subnet_ids.iter().collect(),
            Self::DbCluster {
                db_subnet_group_name,
                ..
            } => vec![db_subnet_group_name],
            Self::DbClusterInstance {
                cluster_identifier,
                engine_version,
                db_subnet_group_name,
                ..
            } => vec![cluster_identifier, &engine_version.from, db_subnet_group_name],
        }
    }
}

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Builds a tag map from key/value pairs.
#[must_use]
pub fn tags<const N: usize>(pairs: [(&str, &str); N]) -> Tags {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Declaration {
        Declaration::new(
            "aurora-postgre-sql-cluster",
            ResourceSpec::DbCluster {
                cluster_identifier: String::from("aurorapostgresql"),
                database_name: String::from("aurorapostgresql"),
                engine: String::from("aurora-postgresql"),
                availability_zones: vec![Zone::new("a")],
                master_username: String::from("admin"),
                master_password: Secret::new("hunter2"),
                db_subnet_group_name: ResourceId::new("dbsubnet-1"),
                skip_final_snapshot: true,
            },
        )
    }

    #[test]
    fn test_wire_format() {
        let decl = Declaration::new(
            "public-route-table",
            ResourceSpec::RouteTable {
                vpc_id: ResourceId::new("vpc-1"),
            },
        );
        let json = serde_json::to_value(&decl).unwrap();

        assert_eq!(json["name"], "public-route-table");
        assert_eq!(json["kind"], "route_table");
        assert_eq!(json["properties"]["vpc_id"], "vpc-1");
    }

    #[test]
    fn test_secret_sent_to_engine_but_not_printed() {
        let decl = cluster();
        let json = serde_json::to_value(&decl).unwrap();
        assert_eq!(json["properties"]["master_password"], "hunter2");
        assert!(!format!("{decl:?}").contains("hunter2"));
    }

    #[test]
    fn test_redacted_copy() {
        let redacted = cluster().redacted();
        let json = serde_json::to_value(&redacted).unwrap();
        assert_eq!(json["properties"]["master_password"], REDACTED);
        assert_eq!(redacted.name, "aurora-postgre-sql-cluster");
    }

    #[test]
    fn test_manifest_entry_parses_back() {
        let json = serde_json::to_string(&cluster()).unwrap();
        let parsed: Declaration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind(), "db_cluster");
        assert_eq!(parsed.spec.references(), vec![&ResourceId::new("dbsubnet-1")]);
    }
}
