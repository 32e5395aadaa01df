// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects and Entities
//!
//! The address space (VPC), its subnets, and the egress path that lets
//! private subnets reach the internet through a shared NAT gateway.
//!
//! Subnet CIDRs are never written by hand: [`plan_subnets`] carves them out
//! of the parent block sequentially, group by group and zone by zone, so the
//! resulting blocks are disjoint and contained in the parent by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

use super::{LogicalId, Reference};

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("Host bits set in network address: {0}")]
    HostBitsSet(String),

    #[error("Subnet mask /{mask} is not narrower than parent {parent}")]
    MaskNotNarrower { parent: Ipv4Cidr, mask: u8 },

    #[error("Address space {parent} exhausted while allocating a /{mask} block")]
    AddressSpaceExhausted { parent: Ipv4Cidr, mask: u8 },

    #[error("Invalid availability zone: {0}")]
    InvalidZone(String),

    #[error("Zone count must be at least 1, got {0}")]
    InvalidZoneCount(usize),
}

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Prefix length 0-32
/// - No host bits set (the address is the network address)
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::Ipv4Cidr;
///
/// let vpc: Ipv4Cidr = "10.20.0.0/16".parse().unwrap();
/// let first = vpc.subnet(24, 0).unwrap();
/// assert_eq!(first.to_string(), "10.20.0.0/24");
/// assert!(vpc.contains(&first));
///
/// assert!("10.20.0.1/16".parse::<Ipv4Cidr>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// The whole IPv4 space, used for "any source" rules
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        address: Ipv4Addr::UNSPECIFIED,
        prefix_len: 0,
    };

    /// Create a network block with validation
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_len));
        }

        let cidr = Self {
            address,
            prefix_len,
        };

        if u32::from(address) & !cidr.mask() != 0 {
            return Err(NetworkError::HostBitsSet(format!("{}/{}", address, prefix_len)));
        }

        Ok(cidr)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len)
        }
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }

    pub fn first_address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn last_address(&self) -> Ipv4Addr {
        let last = u64::from(u32::from(self.address)) + self.size() - 1;
        Ipv4Addr::from(last as u32)
    }

    /// Whether `other` lies entirely within this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len
            && u32::from(other.address) & self.mask() == u32::from(self.address)
    }

    /// Whether a single address lies within this block
    pub fn contains_address(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & self.mask() == u32::from(self.address)
    }

    /// Whether the two blocks share at least one address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The `index`-th block of size `/mask` inside this block
    pub fn subnet(&self, mask: u8, index: u64) -> Result<Ipv4Cidr, NetworkError> {
        if mask > 32 {
            return Err(NetworkError::InvalidPrefixLength(mask));
        }
        if mask < self.prefix_len {
            return Err(NetworkError::MaskNotNarrower { parent: *self, mask });
        }

        let block = 1u64 << (32 - mask);
        let offset = index
            .checked_mul(block)
            .filter(|offset| {
                offset
                    .checked_add(block)
                    .is_some_and(|end| end <= self.size())
            })
            .ok_or(NetworkError::AddressSpaceExhausted { parent: *self, mask })?;

        let address = Ipv4Addr::from((u64::from(u32::from(self.address)) + offset) as u32);
        Self::new(address, mask)
    }

    /// Whether this block covers the whole IPv4 space
    pub fn is_any(&self) -> bool {
        self.prefix_len == 0
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, prefix_str) = s
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(s.to_string()))?;

        let address = addr_str
            .parse::<Ipv4Addr>()
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(s.to_string()))?;

        Self::new(address, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// Availability zone name, e.g. `us-east-1a`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityZone(String);

impl AvailabilityZone {
    pub fn new(zone: impl Into<String>) -> Result<Self, NetworkError> {
        let zone = zone.into();
        if zone.is_empty()
            || !zone
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(NetworkError::InvalidZone(zone));
        }
        Ok(Self(zone))
    }

    /// The first `count` zones of a region, lettered `a`, `b`, ...
    pub fn for_region(region: &str, count: usize) -> Result<Vec<Self>, NetworkError> {
        if count == 0 || count > 26 {
            return Err(NetworkError::InvalidZoneCount(count));
        }
        (b'a'..)
            .take(count)
            .map(|letter| Self::new(format!("{}{}", region, letter as char)))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing role of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    /// Routed through the internet gateway; instances get public addresses
    Public,
    /// No inbound path from the internet; egress through NAT
    PrivateWithEgress,
}

impl SubnetType {
    /// Public subnets auto-assign public addresses, private ones never do
    pub fn maps_public_ip(&self) -> bool {
        matches!(self, SubnetType::Public)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, SubnetType::Public)
    }
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetType::Public => write!(f, "public"),
            SubnetType::PrivateWithEgress => write!(f, "private-with-egress"),
        }
    }
}

/// One subnet role replicated across every availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: String,
    pub subnet_type: SubnetType,
    pub cidr_mask: u8,
}

impl SubnetGroup {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType, cidr_mask: u8) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            cidr_mask,
        }
    }
}

/// A subnet block allocated by [`plan_subnets`], before it becomes a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSubnet {
    pub group: String,
    pub subnet_type: SubnetType,
    pub zone: AvailabilityZone,
    /// 1-based position within the group, matches zone order
    pub ordinal: usize,
    pub cidr: Ipv4Cidr,
}

/// Allocate one block per (group, zone) pair out of `space`
///
/// Blocks are handed out in order, group first then zone, starting at the
/// base of the parent. Each block is aligned to its own size.
pub fn plan_subnets(
    space: &Ipv4Cidr,
    groups: &[SubnetGroup],
    zones: &[AvailabilityZone],
) -> Result<Vec<PlannedSubnet>, NetworkError> {
    if zones.is_empty() {
        return Err(NetworkError::InvalidZoneCount(0));
    }

    let mut planned = Vec::with_capacity(groups.len() * zones.len());
    let mut offset: u64 = 0;

    for group in groups {
        if group.cidr_mask > 32 {
            return Err(NetworkError::InvalidPrefixLength(group.cidr_mask));
        }
        if group.cidr_mask < space.prefix_len() {
            return Err(NetworkError::MaskNotNarrower {
                parent: *space,
                mask: group.cidr_mask,
            });
        }

        let block = 1u64 << (32 - group.cidr_mask);

        for (i, zone) in zones.iter().enumerate() {
            // align up to the block boundary
            offset = offset.div_ceil(block) * block;
            let cidr = space.subnet(group.cidr_mask, offset / block)?;
            offset += block;

            planned.push(PlannedSubnet {
                group: group.name.clone(),
                subnet_type: group.subnet_type,
                zone: zone.clone(),
                ordinal: i + 1,
                cidr,
            });
        }
    }

    Ok(planned)
}

/// The isolated address space (VPC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpace {
    pub logical_id: LogicalId,
    pub name: String,
    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub nat_gateways: usize,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

/// A subnet bound to one zone and one routing role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub logical_id: LogicalId,
    pub group: String,
    pub subnet_type: SubnetType,
    pub zone: AvailabilityZone,
    pub cidr: Ipv4Cidr,
    pub map_public_ip_on_launch: bool,
    pub vpc: Reference,
}

impl Subnet {
    pub fn is_public(&self) -> bool {
        self.subnet_type.is_public()
    }
}

/// Internet gateway attached to the address space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub logical_id: LogicalId,
    pub vpc: Reference,
}

/// Elastic IP backing a NAT gateway
///
/// Allocation waits for the internet gateway to be attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticIp {
    pub logical_id: LogicalId,
    pub internet_gateway: Reference,
}

/// Managed egress path for private subnets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGateway {
    pub logical_id: LogicalId,
    /// Hosting public subnet
    pub subnet: Reference,
    /// `AllocationId` attribute of the elastic IP
    pub allocation: Reference,
}

/// Where a route table sends `0.0.0.0/0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum RouteTarget {
    InternetGateway(Reference),
    NatGateway(Reference),
}

impl RouteTarget {
    pub fn reference(&self) -> &Reference {
        match self {
            RouteTarget::InternetGateway(r) | RouteTarget::NatGateway(r) => r,
        }
    }
}

/// Per-subnet route table with its default route and association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub logical_id: LogicalId,
    pub vpc: Reference,
    pub subnet: Reference,
    pub default_route: RouteTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(n: usize) -> Vec<AvailabilityZone> {
        AvailabilityZone::for_region("us-east-1", n).unwrap()
    }

    #[test]
    fn test_cidr_parsing() {
        let cidr: Ipv4Cidr = "10.20.0.0/16".parse().unwrap();
        assert_eq!(cidr.address(), Ipv4Addr::new(10, 20, 0, 0));
        assert_eq!(cidr.prefix_len(), 16);
        assert_eq!(cidr.size(), 65536);
        assert_eq!(cidr.last_address(), Ipv4Addr::new(10, 20, 255, 255));
        assert_eq!(cidr.to_string(), "10.20.0.0/16");
    }

    #[test]
    fn test_invalid_cidr() {
        assert!("10.20.0.0".parse::<Ipv4Cidr>().is_err());
        assert!("10.20.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.300.0.0/16".parse::<Ipv4Cidr>().is_err());
        assert!(matches!(
            "10.20.1.0/16".parse::<Ipv4Cidr>(),
            Err(NetworkError::HostBitsSet(_))
        ));
    }

    #[test]
    fn test_any_cidr() {
        let any: Ipv4Cidr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(any, Ipv4Cidr::ANY);
        assert!(any.is_any());
        assert!(any.contains(&"10.20.0.0/16".parse().unwrap()));
        assert_eq!(any.last_address(), Ipv4Addr::new(255, 255, 255, 255));
    }

    #[test]
    fn test_containment_and_overlap() {
        let vpc: Ipv4Cidr = "10.20.0.0/16".parse().unwrap();
        let a: Ipv4Cidr = "10.20.1.0/24".parse().unwrap();
        let b: Ipv4Cidr = "10.20.2.0/24".parse().unwrap();
        let outside: Ipv4Cidr = "10.21.0.0/24".parse().unwrap();

        assert!(vpc.contains(&a));
        assert!(!a.contains(&vpc));
        assert!(a.overlaps(&vpc));
        assert!(!a.overlaps(&b));
        assert!(!vpc.contains(&outside));
        assert!(vpc.contains_address(Ipv4Addr::new(10, 20, 7, 9)));
    }

    #[test]
    fn test_subnet_indexing() {
        let vpc: Ipv4Cidr = "10.20.0.0/16".parse().unwrap();
        assert_eq!(vpc.subnet(24, 3).unwrap().to_string(), "10.20.3.0/24");
        assert_eq!(vpc.subnet(24, 255).unwrap().to_string(), "10.20.255.0/24");
        assert!(matches!(
            vpc.subnet(24, 256),
            Err(NetworkError::AddressSpaceExhausted { .. })
        ));
        assert!(matches!(
            vpc.subnet(8, 0),
            Err(NetworkError::MaskNotNarrower { .. })
        ));
    }

    #[test]
    fn test_subnet_index_overflow_is_exhaustion() {
        let vpc: Ipv4Cidr = "10.20.0.0/16".parse().unwrap();
        for index in [u64::MAX / 256, u64::MAX / 2, u64::MAX] {
            assert!(matches!(
                vpc.subnet(24, index),
                Err(NetworkError::AddressSpaceExhausted { .. })
            ));
        }

        let whole: Ipv4Cidr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(whole.subnet(1, 1).unwrap().to_string(), "128.0.0.0/1");
        assert!(whole.subnet(32, u64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_zones_for_region() {
        let zones = zones(3);
        let names: Vec<_> = zones.iter().map(|z| z.as_str()).collect();
        assert_eq!(names, vec!["us-east-1a", "us-east-1b", "us-east-1c"]);
        assert!(AvailabilityZone::for_region("us-east-1", 0).is_err());
        assert!(AvailabilityZone::new("US-EAST").is_err());
    }

    #[test]
    fn test_plan_subnets_sequential() {
        let vpc: Ipv4Cidr = "10.20.0.0/16".parse().unwrap();
        let groups = vec![
            SubnetGroup::new("Public", SubnetType::Public, 24),
            SubnetGroup::new("Private", SubnetType::PrivateWithEgress, 24),
        ];

        let planned = plan_subnets(&vpc, &groups, &zones(2)).unwrap();
        let cidrs: Vec<_> = planned.iter().map(|p| p.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec!["10.20.0.0/24", "10.20.1.0/24", "10.20.2.0/24", "10.20.3.0/24"]
        );
        assert_eq!(planned[0].subnet_type, SubnetType::Public);
        assert_eq!(planned[2].subnet_type, SubnetType::PrivateWithEgress);
        assert_eq!(planned[3].ordinal, 2);
        assert_eq!(planned[3].zone.as_str(), "us-east-1b");
    }

    #[test]
    fn test_plan_subnets_mixed_masks_align() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let groups = vec![
            SubnetGroup::new("Small", SubnetType::Public, 26),
            SubnetGroup::new("Large", SubnetType::PrivateWithEgress, 24),
        ];

        let planned = plan_subnets(&vpc, &groups, &zones(1)).unwrap();
        assert_eq!(planned[0].cidr.to_string(), "10.0.0.0/26");
        assert_eq!(planned[1].cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_plan_subnets_exhaustion() {
        let vpc: Ipv4Cidr = "10.0.0.0/23".parse().unwrap();
        let groups = vec![
            SubnetGroup::new("Public", SubnetType::Public, 24),
            SubnetGroup::new("Private", SubnetType::PrivateWithEgress, 24),
        ];

        assert!(matches!(
            plan_subnets(&vpc, &groups, &zones(2)),
            Err(NetworkError::AddressSpaceExhausted { .. })
        ));
        assert!(plan_subnets(&vpc, &groups, &[]).is_err());
    }

    #[test]
    fn test_subnet_type_public_ip() {
        assert!(SubnetType::Public.maps_public_ip());
        assert!(!SubnetType::PrivateWithEgress.maps_public_ip());
        assert_eq!(SubnetType::PrivateWithEgress.to_string(), "private-with-egress");
    }
}
