// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Kind Taxonomy
//!
//! The closed vocabulary of resources a topology can declare, with the
//! provisioning-engine type name each one renders to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Network
    /// Isolated address space
    Vpc,
    /// Zone-bound subdivision of the address space
    Subnet,
    /// Internet gateway for public subnets
    InternetGateway,
    /// Elastic IP backing a NAT gateway
    ElasticIp,
    /// NAT gateway for private egress
    NatGateway,
    /// Per-subnet route table
    RouteTable,

    // Access control
    /// Firewall rule set
    SecurityGroup,
    /// SSH key pair
    KeyPair,

    // Compute
    /// Standalone instance
    Instance,
    /// Elastic pool of instances
    AutoScalingGroup,

    // Traffic distribution
    /// Application load balancer
    LoadBalancer,
    /// Load balancer listener
    Listener,
    /// Load balancer target group
    TargetGroup,

    // Data
    /// Generated credential secret
    Secret,
    /// Database subnet group
    DbSubnetGroup,
    /// Managed relational database
    DatabaseInstance,
}

impl ResourceKind {
    /// Every kind, in declaration order
    pub const ALL: [ResourceKind; 16] = [
        Self::Vpc,
        Self::Subnet,
        Self::InternetGateway,
        Self::ElasticIp,
        Self::NatGateway,
        Self::RouteTable,
        Self::SecurityGroup,
        Self::KeyPair,
        Self::Instance,
        Self::AutoScalingGroup,
        Self::LoadBalancer,
        Self::Listener,
        Self::TargetGroup,
        Self::Secret,
        Self::DbSubnetGroup,
        Self::DatabaseInstance,
    ];

    /// Canonical snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet_gateway",
            Self::ElasticIp => "elastic_ip",
            Self::NatGateway => "nat_gateway",
            Self::RouteTable => "route_table",
            Self::SecurityGroup => "security_group",
            Self::KeyPair => "key_pair",
            Self::Instance => "instance",
            Self::AutoScalingGroup => "auto_scaling_group",
            Self::LoadBalancer => "load_balancer",
            Self::Listener => "listener",
            Self::TargetGroup => "target_group",
            Self::Secret => "secret",
            Self::DbSubnetGroup => "db_subnet_group",
            Self::DatabaseInstance => "database_instance",
        }
    }

    /// Resource type name understood by the provisioning engine
    pub fn engine_type(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::ElasticIp => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::KeyPair => "AWS::EC2::KeyPair",
            Self::Instance => "AWS::EC2::Instance",
            Self::AutoScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Secret => "AWS::SecretsManager::Secret",
            Self::DbSubnetGroup => "AWS::RDS::DBSubnetGroup",
            Self::DatabaseInstance => "AWS::RDS::DBInstance",
        }
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vpc => "VPC",
            Self::Subnet => "Subnet",
            Self::InternetGateway => "Internet Gateway",
            Self::ElasticIp => "Elastic IP",
            Self::NatGateway => "NAT Gateway",
            Self::RouteTable => "Route Table",
            Self::SecurityGroup => "Security Group",
            Self::KeyPair => "Key Pair",
            Self::Instance => "Instance",
            Self::AutoScalingGroup => "Auto Scaling Group",
            Self::LoadBalancer => "Load Balancer",
            Self::Listener => "Listener",
            Self::TargetGroup => "Target Group",
            Self::Secret => "Secret",
            Self::DbSubnetGroup => "DB Subnet Group",
            Self::DatabaseInstance => "Database Instance",
        }
    }

    /// Descriptor block this kind belongs to
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::InternetGateway
            | Self::ElasticIp
            | Self::NatGateway
            | Self::RouteTable => ResourceCategory::Network,
            Self::SecurityGroup | Self::KeyPair => ResourceCategory::AccessControl,
            Self::Instance | Self::AutoScalingGroup => ResourceCategory::Compute,
            Self::LoadBalancer | Self::Listener | Self::TargetGroup => {
                ResourceCategory::TrafficDistribution
            }
            Self::Secret | Self::DbSubnetGroup | Self::DatabaseInstance => ResourceCategory::Data,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptor blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Network,
    AccessControl,
    Compute,
    TrafficDistribution,
    Data,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::AccessControl => write!(f, "access-control"),
            Self::Compute => write!(f, "compute"),
            Self::TrafficDistribution => write!(f, "traffic-distribution"),
            Self::Data => write!(f, "data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_engine_types_unique() {
        let types: HashSet<_> = ResourceKind::ALL.iter().map(|k| k.engine_type()).collect();
        assert_eq!(types.len(), ResourceKind::ALL.len());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ResourceKind::NatGateway.category(), ResourceCategory::Network);
        assert_eq!(
            ResourceKind::SecurityGroup.category(),
            ResourceCategory::AccessControl
        );
        assert_eq!(
            ResourceKind::AutoScalingGroup.category(),
            ResourceCategory::Compute
        );
        assert_eq!(
            ResourceKind::Listener.category(),
            ResourceCategory::TrafficDistribution
        );
        assert_eq!(ResourceKind::Secret.category(), ResourceCategory::Data);
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceKind::DbSubnetGroup.to_string(), "db_subnet_group");
        assert_eq!(ResourceKind::ElasticIp.display_name(), "Elastic IP");
        assert_eq!(
            serde_json::to_string(&ResourceKind::AutoScalingGroup).unwrap(),
            "\"auto_scaling_group\""
        );
    }
}
