//! IPv4 address blocks used by the subnet planner.
//!
//! The planner only ever carves a /16 into /24s, so both types store the
//! network address alone and derive the prefix from the type.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::error::{PlanError, Result};

/// A /16 IPv4 block: the address universe of one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkBlock {
    /// Network address with the host octets zeroed.
    base: Ipv4Addr,
}

/// A /24 carved out of a [`NetworkBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubnetCidr {
    /// Network address with the host octet zeroed.
    base: Ipv4Addr,
}

impl NetworkBlock {
    /// Prefix length of the block.
    pub const PREFIX_LEN: u8 = 16;

    /// Prefix length of every planned subnet.
    pub const SUBNET_PREFIX_LEN: u8 = 24;

    /// Number of /24 subnets a /16 holds.
    pub const SUBNET_CAPACITY: usize = 256;

    /// Parses a block from CIDR notation, e.g. `10.0.0.0/16`.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidNetworkBlock` if the string is not an
    /// IPv4 /16 with zeroed host bits.
    pub fn parse(cidr: &str) -> Result<Self> {
        let invalid = |reason: &str| PlanError::InvalidNetworkBlock {
            cidr: cidr.to_string(),
            reason: reason.to_string(),
        };

        let (addr, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| invalid("expected ADDRESS/PREFIX"))?;

        let prefix: u8 = prefix.parse().map_err(|_| invalid("prefix is not a number"))?;
        if prefix != Self::PREFIX_LEN {
            return Err(invalid("only /16 blocks are supported").into());
        }

        let base: Ipv4Addr = addr.parse().map_err(|_| invalid("not an IPv4 address"))?;
        let [_, _, c, d] = base.octets();
        if c != 0 || d != 0 {
            return Err(invalid("host bits must be zero").into());
        }

        Ok(Self { base })
    }

    /// Returns the /24 at the given offset inside this block.
    #[must_use]
    pub const fn subnet(&self, offset: u8) -> SubnetCidr {
        let [a, b, _, _] = self.base.octets();
        SubnetCidr {
            base: Ipv4Addr::new(a, b, offset, 0),
        }
    }

    /// Returns true if the subnet lies inside this block.
    #[must_use]
    pub const fn contains(&self, subnet: &SubnetCidr) -> bool {
        let [a, b, _, _] = self.base.octets();
        let [sa, sb, _, _] = subnet.base.octets();
        a == sa && b == sb
    }
}

impl SubnetCidr {
    /// Returns the offset (third octet) of this subnet within its block.
    #[must_use]
    pub const fn offset(&self) -> u8 {
        self.base.octets()[2]
    }
}

impl Default for NetworkBlock {
    fn default() -> Self {
        Self {
            base: Ipv4Addr::new(10, 0, 0, 0),
        }
    }
}

impl std::fmt::Display for NetworkBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, Self::PREFIX_LEN)
    }
}

impl std::fmt::Display for SubnetCidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, NetworkBlock::SUBNET_PREFIX_LEN)
    }
}

impl TryFrom<String> for NetworkBlock {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s).map_err(|e| e.to_string())
    }
}

impl From<NetworkBlock> for String {
    fn from(block: NetworkBlock) -> Self {
        block.to_string()
    }
}

impl TryFrom<String> for SubnetCidr {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("Invalid subnet: {s}. Expected ADDRESS/24"))?;
        if prefix != "24" {
            return Err(format!("Invalid subnet prefix: {prefix}. Expected 24"));
        }
        let base: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("Invalid subnet address: {addr}"))?;
        if base.octets()[3] != 0 {
            return Err(format!("Subnet host bits must be zero: {s}"));
        }
        Ok(Self { base })
    }
}

impl From<SubnetCidr> for String {
    fn from(cidr: SubnetCidr) -> Self {
        cidr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block() {
        let block = NetworkBlock::parse("10.0.0.0/16").unwrap();
        assert_eq!(block.to_string(), "10.0.0.0/16");
        assert_eq!(block, NetworkBlock::default());
    }

    #[test]
    fn test_parse_rejects_other_prefixes() {
        assert!(NetworkBlock::parse("10.0.0.0/8").is_err());
        assert!(NetworkBlock::parse("10.0.0.0/24").is_err());
        assert!(NetworkBlock::parse("10.0.0.0").is_err());
    }

    #[test]
    fn test_parse_rejects_host_bits() {
        assert!(NetworkBlock::parse("10.0.1.0/16").is_err());
        assert!(NetworkBlock::parse("10.0.0.7/16").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(NetworkBlock::parse("ten.zero/16").is_err());
        assert!(NetworkBlock::parse("10.0.0.0/x").is_err());
    }

    #[test]
    fn test_subnet_at_offset() {
        let block = NetworkBlock::parse("172.31.0.0/16").unwrap();
        let subnet = block.subnet(5);
        assert_eq!(subnet.to_string(), "172.31.5.0/24");
        assert_eq!(subnet.offset(), 5);
        assert!(block.contains(&subnet));
        assert!(!NetworkBlock::default().contains(&subnet));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&NetworkBlock::default().subnet(3)).unwrap();
        assert_eq!(json, "\"10.0.3.0/24\"");

        let parsed: SubnetCidr = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.offset(), 3);
    }
}
