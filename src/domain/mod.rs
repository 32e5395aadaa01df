// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Value objects and entities for every resource a topology can declare,
//! plus the pure invariant functions the descriptor is validated with.
//!
//! # Value Objects with Invariants
//!
//! - [`LogicalId`] - Stack-local alphanumeric identifier
//! - [`Ipv4Cidr`] - IPv4 network block, no host bits set
//! - [`AvailabilityZone`] - Zone name within a region
//! - [`InstanceType`] - Size class such as `t2.micro`
//! - [`PortRange`] / [`Peer`] - Firewall rule components
//! - [`GenerationConstraints`] - Shape of a generated secret value
//!
//! # Entities
//!
//! - Network: [`AddressSpace`], [`Subnet`], [`InternetGateway`], [`ElasticIp`],
//!   [`NatGateway`], [`RouteTable`]
//! - Access control: [`FirewallRuleSet`]
//! - Compute: [`KeyPair`], [`ComputeInstance`], [`ElasticPool`]
//! - Traffic: [`LoadBalancer`], [`Listener`], [`TargetGroup`]
//! - Data: [`CredentialSecret`], [`DbSubnetGroup`], [`DatabaseInstance`]
//!
//! Entities point at each other through [`Reference`] values; [`Resource`]
//! is the closed sum the descriptor stores.

pub mod compute;
pub mod database;
pub mod firewall;
pub mod invariants;
pub mod load_balancer;
pub mod logical_id;
pub mod network;
pub mod resource;
pub mod resource_type;
pub mod secret;

pub use compute::{
    AmazonLinuxGeneration, ComputeError, ComputeInstance, ElasticPool, InstanceClass,
    InstanceSize, InstanceType, KeyPair, MachineImage, PoolCapacity,
};
pub use database::{
    BackupPolicy, Credentials, DatabaseEngine, DatabaseInstance, DbSubnetGroup, EngineKind,
    RemovalPolicy,
};
pub use firewall::{
    EgressPolicy, FirewallRole, FirewallRuleSet, IngressRule, Peer, PortRange, Protocol,
};
pub use invariants::{ValidationError, ValidationResult};
pub use load_balancer::{
    ApplicationProtocol, HealthCheck, Listener, LoadBalancer, TargetGroup, TargetType,
};
pub use logical_id::{LogicalId, LogicalIdError, Reference};
pub use network::{
    plan_subnets, AddressSpace, AvailabilityZone, ElasticIp, InternetGateway, Ipv4Cidr,
    NatGateway, NetworkError, PlannedSubnet, RouteTable, RouteTarget, Subnet, SubnetGroup,
    SubnetType,
};
pub use resource::Resource;
pub use resource_type::{ResourceCategory, ResourceKind};
pub use secret::{CredentialSecret, GenerationConstraints, SecretError, SecretFieldRef, SecretTemplate};
