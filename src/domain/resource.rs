// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declared Resource
//!
//! The closed sum of everything a topology can declare. Each variant knows
//! its logical id, its kind, and which other resources it depends on.

use serde::{Deserialize, Serialize};

use super::{
    AddressSpace, ComputeInstance, CredentialSecret, Credentials, DatabaseInstance,
    DbSubnetGroup, ElasticIp, ElasticPool, FirewallRuleSet, InternetGateway, KeyPair, Listener,
    LoadBalancer, LogicalId, NatGateway, Reference, ResourceKind, RouteTable, Subnet, TargetGroup,
};

/// One declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Vpc(AddressSpace),
    Subnet(Subnet),
    InternetGateway(InternetGateway),
    ElasticIp(ElasticIp),
    NatGateway(NatGateway),
    RouteTable(RouteTable),
    SecurityGroup(FirewallRuleSet),
    KeyPair(KeyPair),
    Instance(ComputeInstance),
    AutoScalingGroup(ElasticPool),
    LoadBalancer(LoadBalancer),
    Listener(Listener),
    TargetGroup(TargetGroup),
    Secret(CredentialSecret),
    DbSubnetGroup(DbSubnetGroup),
    DatabaseInstance(DatabaseInstance),
}

impl Resource {
    pub fn logical_id(&self) -> &LogicalId {
        match self {
            Resource::Vpc(r) => &r.logical_id,
            Resource::Subnet(r) => &r.logical_id,
            Resource::InternetGateway(r) => &r.logical_id,
            Resource::ElasticIp(r) => &r.logical_id,
            Resource::NatGateway(r) => &r.logical_id,
            Resource::RouteTable(r) => &r.logical_id,
            Resource::SecurityGroup(r) => &r.logical_id,
            Resource::KeyPair(r) => &r.logical_id,
            Resource::Instance(r) => &r.logical_id,
            Resource::AutoScalingGroup(r) => &r.logical_id,
            Resource::LoadBalancer(r) => &r.logical_id,
            Resource::Listener(r) => &r.logical_id,
            Resource::TargetGroup(r) => &r.logical_id,
            Resource::Secret(r) => &r.logical_id,
            Resource::DbSubnetGroup(r) => &r.logical_id,
            Resource::DatabaseInstance(r) => &r.logical_id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Vpc(_) => ResourceKind::Vpc,
            Resource::Subnet(_) => ResourceKind::Subnet,
            Resource::InternetGateway(_) => ResourceKind::InternetGateway,
            Resource::ElasticIp(_) => ResourceKind::ElasticIp,
            Resource::NatGateway(_) => ResourceKind::NatGateway,
            Resource::RouteTable(_) => ResourceKind::RouteTable,
            Resource::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Resource::KeyPair(_) => ResourceKind::KeyPair,
            Resource::Instance(_) => ResourceKind::Instance,
            Resource::AutoScalingGroup(_) => ResourceKind::AutoScalingGroup,
            Resource::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Resource::Listener(_) => ResourceKind::Listener,
            Resource::TargetGroup(_) => ResourceKind::TargetGroup,
            Resource::Secret(_) => ResourceKind::Secret,
            Resource::DbSubnetGroup(_) => ResourceKind::DbSubnetGroup,
            Resource::DatabaseInstance(_) => ResourceKind::DatabaseInstance,
        }
    }

    /// Logical ids this resource refers to, in declaration order, deduplicated
    pub fn dependencies(&self) -> Vec<&LogicalId> {
        fn targets<'a>(refs: impl IntoIterator<Item = &'a Reference>) -> Vec<&'a LogicalId> {
            refs.into_iter().map(Reference::target).collect()
        }

        let mut deps = match self {
            Resource::Vpc(_) | Resource::KeyPair(_) | Resource::Secret(_) => Vec::new(),
            Resource::Subnet(r) => targets([&r.vpc]),
            Resource::InternetGateway(r) => targets([&r.vpc]),
            Resource::ElasticIp(r) => targets([&r.internet_gateway]),
            Resource::NatGateway(r) => targets([&r.subnet, &r.allocation]),
            Resource::RouteTable(r) => targets([&r.vpc, &r.subnet, r.default_route.reference()]),
            Resource::SecurityGroup(r) => targets([&r.vpc]),
            Resource::Instance(r) => targets(
                [&r.subnet, &r.security_group]
                    .into_iter()
                    .chain(r.key_pair.as_ref()),
            ),
            Resource::AutoScalingGroup(r) => targets(r.subnets.iter().chain(&r.target_groups)),
            Resource::LoadBalancer(r) => {
                targets(r.subnets.iter().chain(std::iter::once(&r.security_group)))
            }
            Resource::Listener(r) => targets([&r.load_balancer, &r.default_target_group]),
            Resource::TargetGroup(r) => targets([&r.vpc]),
            Resource::DbSubnetGroup(r) => targets(&r.subnets),
            Resource::DatabaseInstance(r) => {
                let mut deps = targets(
                    std::iter::once(&r.subnet_group).chain(&r.security_groups),
                );
                match &r.credentials {
                    Credentials::FromSecret { username, password } => {
                        deps.push(&username.secret);
                        deps.push(&password.secret);
                    }
                }
                deps
            }
        };

        let mut seen = std::collections::HashSet::new();
        deps.retain(|id| seen.insert(*id));
        deps
    }
}

macro_rules! impl_from_entity {
    ($($entity:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$entity> for Resource {
                fn from(entity: $entity) -> Self {
                    Resource::$variant(entity)
                }
            }
        )*
    };
}

impl_from_entity! {
    AddressSpace => Vpc,
    Subnet => Subnet,
    InternetGateway => InternetGateway,
    ElasticIp => ElasticIp,
    NatGateway => NatGateway,
    RouteTable => RouteTable,
    FirewallRuleSet => SecurityGroup,
    KeyPair => KeyPair,
    ComputeInstance => Instance,
    ElasticPool => AutoScalingGroup,
    LoadBalancer => LoadBalancer,
    Listener => Listener,
    TargetGroup => TargetGroup,
    CredentialSecret => Secret,
    DbSubnetGroup => DbSubnetGroup,
    DatabaseInstance => DatabaseInstance,
}
