// Copyright (c) 2025 - Cowboy AI, Inc.
//! Firewall Rule Sets
//!
//! Each rule set is owned by one logical role. Host, load balancer and
//! database exposure are declared independently so narrowing one never
//! touches another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Ipv4Cidr, LogicalId, Reference};

/// Transport protocol of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            from: port,
            to: port,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.from..=self.to).contains(&port)
    }

    pub fn is_single(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Traffic source of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cidr", rename_all = "snake_case")]
pub enum Peer {
    /// `0.0.0.0/0`
    AnyIpv4,
    Cidr(Ipv4Cidr),
}

impl Peer {
    pub fn cidr(&self) -> Ipv4Cidr {
        match self {
            Peer::AnyIpv4 => Ipv4Cidr::ANY,
            Peer::Cidr(cidr) => *cidr,
        }
    }

    /// Whether the peer admits every IPv4 source
    pub fn is_unrestricted(&self) -> bool {
        self.cidr().is_any()
    }

    /// Parse `any` or a CIDR block
    pub fn parse(s: &str) -> Result<Self, super::NetworkError> {
        if s.eq_ignore_ascii_case("any") {
            return Ok(Peer::AnyIpv4);
        }
        let cidr: Ipv4Cidr = s.parse()?;
        Ok(if cidr.is_any() {
            Peer::AnyIpv4
        } else {
            Peer::Cidr(cidr)
        })
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr())
    }
}

/// One allowed (source, protocol, ports) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub protocol: Protocol,
    pub ports: PortRange,
    pub description: String,
}

impl IngressRule {
    pub fn tcp(peer: Peer, port: u16, description: impl Into<String>) -> Self {
        Self {
            peer,
            protocol: Protocol::Tcp,
            ports: PortRange::single(port),
            description: description.into(),
        }
    }

    /// The (protocol, ports) pair this rule opens
    pub fn pair(&self) -> (Protocol, PortRange) {
        (self.protocol, self.ports)
    }
}

/// Outbound policy of a rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressPolicy {
    AllowAll,
    DenyAll,
}

impl FromStr for EgressPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "allow_all" => Ok(Self::AllowAll),
            "deny_all" => Ok(Self::DenyAll),
            other => Err(format!("unknown egress policy {:?}, expected allow_all or deny_all", other)),
        }
    }
}

/// Logical role that owns a rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirewallRole {
    /// Standalone compute hosts
    Host,
    /// Internet-facing load balancer
    LoadBalancer,
    /// Managed database
    Database,
}

impl FirewallRole {
    pub const ALL: [FirewallRole; 3] = [Self::Host, Self::LoadBalancer, Self::Database];
}

impl fmt::Display for FirewallRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirewallRole::Host => write!(f, "host"),
            FirewallRole::LoadBalancer => write!(f, "load-balancer"),
            FirewallRole::Database => write!(f, "database"),
        }
    }
}

/// Firewall rule set (security group) scoped to one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRuleSet {
    pub logical_id: LogicalId,
    pub group_name: String,
    pub description: String,
    pub role: FirewallRole,
    pub vpc: Reference,
    pub ingress: Vec<IngressRule>,
    pub egress: EgressPolicy,
}

impl FirewallRuleSet {
    pub fn new(
        logical_id: LogicalId,
        group_name: impl Into<String>,
        role: FirewallRole,
        vpc: Reference,
    ) -> Self {
        let group_name = group_name.into();
        Self {
            logical_id,
            description: format!("{} ingress for the {} role", group_name, role),
            group_name,
            role,
            vpc,
            ingress: Vec::new(),
            egress: EgressPolicy::AllowAll,
        }
    }

    pub fn allow(mut self, rule: IngressRule) -> Self {
        self.ingress.push(rule);
        self
    }

    pub fn with_egress(mut self, egress: EgressPolicy) -> Self {
        self.egress = egress;
        self
    }

    /// Whether traffic on `protocol`/`port` from `source` is admitted
    pub fn permits(&self, protocol: Protocol, port: u16, source: &Ipv4Cidr) -> bool {
        self.ingress.iter().any(|rule| {
            rule.protocol == protocol && rule.ports.contains(port) && rule.peer.cidr().contains(source)
        })
    }

    /// Distinct (protocol, ports) pairs opened by this rule set
    pub fn opened_pairs(&self) -> Vec<(Protocol, PortRange)> {
        let mut pairs: Vec<_> = self.ingress.iter().map(IngressRule::pair).collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }

    /// Whether any rule admits every IPv4 source
    pub fn has_unrestricted_ingress(&self) -> bool {
        self.ingress.iter().any(|rule| rule.peer.is_unrestricted())
    }
}
