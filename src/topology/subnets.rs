//! Subnet planner: partitions the network block into per-zone /24s.
//!
//! Private subnets take offsets `0..k`, public subnets take
//! `k..2k` where `k` is the number of private subnets actually planned.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};

use super::model::{SubnetPlan, Tier, Zone};
use super::network::NetworkBlock;

/// Planned subnets for both tiers, each index-aligned with the zone list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetLayout {
    /// Private tier, one per zone.
    pub private: Vec<SubnetPlan>,
    /// Public tier, one per zone.
    pub public: Vec<SubnetPlan>,
}

/// Plans one private and one public /24 per zone.
///
/// # Errors
///
/// Returns `PlanError::AddressSpaceExhausted` if the two tiers need more
/// /24s than the block holds.
pub fn plan_subnets(block: &NetworkBlock, zones: &[Zone]) -> Result<SubnetLayout> {
    let required = zones.len() * 2;
    if required > NetworkBlock::SUBNET_CAPACITY {
        return Err(exhausted(required).into());
    }

    let private = plan_tier(block, Tier::Private, zones, 0)?;
    // Public offsets start after however many private subnets were planned.
    let public = plan_tier(block, Tier::Public, zones, private.len())?;

    debug!(
        "Planned {} private and {} public subnets in {block}",
        private.len(),
        public.len()
    );

    Ok(SubnetLayout { private, public })
}

fn plan_tier(block: &NetworkBlock, tier: Tier, zones: &[Zone], first_offset: usize) -> Result<Vec<SubnetPlan>> {
    zones
        .iter()
        .enumerate()
        .map(|(index, zone)| -> Result<SubnetPlan> {
            let offset = u8::try_from(first_offset + index).map_err(|_| exhausted(first_offset + zones.len()))?;
            Ok(SubnetPlan {
                tier,
                index,
                zone: zone.clone(),
                cidr: block.subnet(offset),
            })
        })
        .collect()
}

const fn exhausted(required: usize) -> PlanError {
    PlanError::AddressSpaceExhausted {
        required,
        available: NetworkBlock::SUBNET_CAPACITY,
    }
}

impl SubnetLayout {
    /// Returns all planned subnets, private tier first.
    pub fn all(&self) -> impl Iterator<Item = &SubnetPlan> {
        self.private.iter().chain(self.public.iter())
    }

    /// Returns the zones of the private tier, in order.
    #[must_use]
    pub fn private_zones(&self) -> Vec<Zone> {
        self.private.iter().map(|s| s.zone.clone()).collect()
    }

    /// Returns the total number of planned subnets.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.private.len() + self.public.len()
    }

    /// Returns true if no subnets were planned.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.private.is_empty() && self.public.is_empty()
    }
}
