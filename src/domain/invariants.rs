// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Every business rule the descriptor must satisfy, as small pure functions
//! over domain values. `Topology::validate` composes them.
//!
//! # Invariant Categories
//!
//! 1. **Network**: subnet containment, disjointness, addressing, routing
//! 2. **Access control**: one rule set per role, one port pair per rule set
//! 3. **Placement**: public/private placement of compute and data
//! 4. **Credentials**: secrets referenced, never embedded
//! 5. **Traffic**: listener/target agreement, health check sanity
//! 6. **Production readiness**: opt-in stricter posture

use std::collections::HashMap;

use super::{
    ComputeInstance, CredentialSecret, Credentials, DatabaseInstance, DbSubnetGroup, ElasticPool,
    FirewallRole, FirewallRuleSet, Ipv4Cidr, Listener, LoadBalancer, LogicalId, NatGateway,
    Reference, ResourceKind, RouteTable, RouteTarget, Subnet, SubnetType, TargetGroup,
};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Lookup from logical id to subnet
pub type SubnetIndex<'a> = HashMap<&'a LogicalId, &'a Subnet>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(LogicalId),

    #[error("{from} references unknown resource {to}")]
    DanglingReference { from: LogicalId, to: LogicalId },

    #[error("{from} expects {to} to be a {expected}")]
    WrongReferenceKind {
        from: LogicalId,
        to: LogicalId,
        expected: ResourceKind,
    },

    #[error("Expected exactly {expected} {kind}, found {actual}")]
    Cardinality {
        kind: ResourceKind,
        expected: usize,
        actual: usize,
    },

    #[error("Subnet {subnet} ({cidr}) lies outside address space {space}")]
    SubnetOutsideSpace {
        subnet: LogicalId,
        cidr: Ipv4Cidr,
        space: Ipv4Cidr,
    },

    #[error("Subnets {first} and {second} overlap")]
    OverlappingSubnets { first: LogicalId, second: LogicalId },

    #[error("Subnet {subnet} is {subnet_type} but map_public_ip_on_launch is {actual}")]
    PublicIpMismatch {
        subnet: LogicalId,
        subnet_type: SubnetType,
        actual: bool,
    },

    #[error("Subnet {0} has no route table")]
    MissingRouteTable(LogicalId),

    #[error("Route table {route_table} of a {subnet_type} subnet must not route to {target}")]
    InvalidDefaultRoute {
        route_table: LogicalId,
        subnet_type: SubnetType,
        target: LogicalId,
    },

    #[error("NAT gateway {0} must sit in a public subnet")]
    NatGatewayNotPublic(LogicalId),

    #[error("NAT gateway count {count} invalid for {zones} zones (need 1..={zones})")]
    InvalidNatGatewayCount { count: usize, zones: usize },

    #[error("Role {role} has {count} rule sets, expected exactly one")]
    RuleSetCountForRole { role: FirewallRole, count: usize },

    #[error("{resource} needs a {expected} rule set but {rule_set} belongs to {actual}")]
    RuleSetRoleMismatch {
        resource: LogicalId,
        rule_set: LogicalId,
        expected: FirewallRole,
        actual: FirewallRole,
    },

    #[error("Rule set {rule_set} opens {count} protocol/port pairs, expected exactly one")]
    RuleSetPairCount { rule_set: LogicalId, count: usize },

    #[error("{resource} must be placed in a {expected} subnet, found {actual}")]
    PlacementMismatch {
        resource: LogicalId,
        expected: SubnetType,
        actual: SubnetType,
    },

    #[error("{0} requests a public address but is not in a public subnet")]
    PublicAddressInPrivateSubnet(LogicalId),

    #[error("{0} sits in a public subnet without a public address")]
    MissingPublicAddress(LogicalId),

    #[error("Pool {pool} capacity invalid: min {min}, max {max}, desired {desired:?}")]
    InvalidPoolCapacity {
        pool: LogicalId,
        min: u32,
        max: u32,
        desired: Option<u32>,
    },

    #[error("Database {0} must be private: private subnets only, not publicly accessible")]
    DatabaseNotPrivate(LogicalId),

    #[error("Database {database} credentials reference unknown secret {secret}")]
    UnknownSecret { database: LogicalId, secret: LogicalId },

    #[error("Secret {secret} has no field {field}")]
    MissingSecretField { secret: LogicalId, field: String },

    #[error("Password field {field} of secret {secret} is not generated")]
    PasswordNotGenerated { secret: LogicalId, field: String },

    #[error(
        "Listener {listener} port {listener_port} does not match target group {target_group} port {target_port}"
    )]
    PortMismatch {
        listener: LogicalId,
        listener_port: u16,
        target_group: LogicalId,
        target_port: u16,
    },

    #[error("Health check of {target_group} invalid: {reason}")]
    InvalidHealthCheck { target_group: LogicalId, reason: String },

    #[error("Load balancer {0} must be internet-facing and placed in public subnets")]
    LoadBalancerNotPublic(LogicalId),

    #[error("Not production ready: {0}")]
    NotProductionReady(String),
}

/// Subnets are contained in the parent space and pairwise disjoint
pub fn validate_subnet_layout(space: &Ipv4Cidr, subnets: &[&Subnet]) -> ValidationResult {
    for subnet in subnets {
        if !space.contains(&subnet.cidr) {
            return Err(ValidationError::SubnetOutsideSpace {
                subnet: subnet.logical_id.clone(),
                cidr: subnet.cidr,
                space: *space,
            });
        }
    }

    for (i, first) in subnets.iter().enumerate() {
        for second in &subnets[i + 1..] {
            if first.cidr.overlaps(&second.cidr) {
                return Err(ValidationError::OverlappingSubnets {
                    first: first.logical_id.clone(),
                    second: second.logical_id.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Public subnets auto-assign public addresses, private subnets never do
pub fn validate_subnet_addressing(subnet: &Subnet) -> ValidationResult {
    if subnet.map_public_ip_on_launch != subnet.subnet_type.maps_public_ip() {
        return Err(ValidationError::PublicIpMismatch {
            subnet: subnet.logical_id.clone(),
            subnet_type: subnet.subnet_type,
            actual: subnet.map_public_ip_on_launch,
        });
    }
    Ok(())
}

/// NAT gateways: at least one, at most one per zone
pub fn validate_nat_gateway_count(count: usize, zones: usize) -> ValidationResult {
    if count == 0 || count > zones {
        return Err(ValidationError::InvalidNatGatewayCount { count, zones });
    }
    Ok(())
}

/// NAT gateways live in public subnets
pub fn validate_nat_placement(nat: &NatGateway, subnets: &SubnetIndex<'_>) -> ValidationResult {
    match subnets.get(nat.subnet.target()) {
        Some(subnet) if subnet.is_public() => Ok(()),
        _ => Err(ValidationError::NatGatewayNotPublic(nat.logical_id.clone())),
    }
}

/// Every subnet has a route table; public ones default-route to the internet
/// gateway, private ones to a NAT gateway
pub fn validate_routing(subnets: &[&Subnet], route_tables: &[&RouteTable]) -> ValidationResult {
    for subnet in subnets {
        let table = route_tables
            .iter()
            .find(|rt| rt.subnet.target() == &subnet.logical_id)
            .ok_or_else(|| ValidationError::MissingRouteTable(subnet.logical_id.clone()))?;

        let allowed = match (&subnet.subnet_type, &table.default_route) {
            (SubnetType::Public, RouteTarget::InternetGateway(_)) => true,
            (SubnetType::PrivateWithEgress, RouteTarget::NatGateway(_)) => true,
            _ => false,
        };

        if !allowed {
            return Err(ValidationError::InvalidDefaultRoute {
                route_table: table.logical_id.clone(),
                subnet_type: subnet.subnet_type,
                target: table.default_route.reference().target().clone(),
            });
        }
    }
    Ok(())
}

/// Exactly one rule set per role
pub fn validate_rule_set_roles(rule_sets: &[&FirewallRuleSet]) -> ValidationResult {
    for role in FirewallRole::ALL {
        let count = rule_sets.iter().filter(|rs| rs.role == role).count();
        if count != 1 {
            return Err(ValidationError::RuleSetCountForRole { role, count });
        }
    }
    Ok(())
}

/// A resource's rule set belongs to the role the resource plays
pub fn validate_rule_set_attachment(
    resource: &LogicalId,
    expected: FirewallRole,
    attached: &Reference,
    rule_sets: &[&FirewallRuleSet],
) -> ValidationResult {
    let rule_set = rule_sets
        .iter()
        .find(|rs| &rs.logical_id == attached.target())
        .ok_or_else(|| ValidationError::WrongReferenceKind {
            from: resource.clone(),
            to: attached.target().clone(),
            expected: ResourceKind::SecurityGroup,
        })?;

    if rule_set.role != expected {
        return Err(ValidationError::RuleSetRoleMismatch {
            resource: resource.clone(),
            rule_set: rule_set.logical_id.clone(),
            expected,
            actual: rule_set.role,
        });
    }
    Ok(())
}

/// A rule set opens exactly one protocol/port pair
pub fn validate_single_pair(rule_set: &FirewallRuleSet) -> ValidationResult {
    let count = rule_set.opened_pairs().len();
    if count != 1 {
        return Err(ValidationError::RuleSetPairCount {
            rule_set: rule_set.logical_id.clone(),
            count,
        });
    }
    Ok(())
}

/// Public flag and subnet type of a standalone instance agree
pub fn validate_instance_placement(
    instance: &ComputeInstance,
    subnets: &SubnetIndex<'_>,
) -> ValidationResult {
    let subnet = lookup_subnet(&instance.logical_id, &instance.subnet, subnets)?;

    if subnet.subnet_type != instance.placement {
        return Err(ValidationError::PlacementMismatch {
            resource: instance.logical_id.clone(),
            expected: instance.placement,
            actual: subnet.subnet_type,
        });
    }

    match (instance.associate_public_ip, subnet.is_public()) {
        (true, false) => Err(ValidationError::PublicAddressInPrivateSubnet(
            instance.logical_id.clone(),
        )),
        (false, true) => Err(ValidationError::MissingPublicAddress(
            instance.logical_id.clone(),
        )),
        _ => Ok(()),
    }
}

/// Elastic pool members land only in private subnets
pub fn validate_pool_placement(pool: &ElasticPool, subnets: &SubnetIndex<'_>) -> ValidationResult {
    for reference in &pool.subnets {
        let subnet = lookup_subnet(&pool.logical_id, reference, subnets)?;
        if subnet.is_public() || pool.placement.is_public() {
            return Err(ValidationError::PublicAddressInPrivateSubnet(
                pool.logical_id.clone(),
            ));
        }
    }
    Ok(())
}

/// Pool bounds are ordered and the desired size lies within them
pub fn validate_pool_capacity(pool: &ElasticPool) -> ValidationResult {
    let capacity = pool.capacity;
    if !capacity.is_consistent() {
        return Err(ValidationError::InvalidPoolCapacity {
            pool: pool.logical_id.clone(),
            min: capacity.min,
            max: capacity.max,
            desired: capacity.desired,
        });
    }
    Ok(())
}

/// The database never touches a public subnet
pub fn validate_database_placement(
    database: &DatabaseInstance,
    group: &DbSubnetGroup,
    subnets: &SubnetIndex<'_>,
) -> ValidationResult {
    if database.publicly_accessible || database.placement.is_public() {
        return Err(ValidationError::DatabaseNotPrivate(database.logical_id.clone()));
    }

    for reference in &group.subnets {
        let subnet = lookup_subnet(&group.logical_id, reference, subnets)?;
        if subnet.is_public() {
            return Err(ValidationError::DatabaseNotPrivate(database.logical_id.clone()));
        }
    }
    Ok(())
}

/// Credentials point at an existing secret whose password field is generated
pub fn validate_credentials(
    database: &DatabaseInstance,
    secrets: &[&CredentialSecret],
) -> ValidationResult {
    let Credentials::FromSecret { username, password } = &database.credentials;

    for field_ref in [username, password] {
        let secret = secrets
            .iter()
            .find(|s| s.logical_id == field_ref.secret)
            .ok_or_else(|| ValidationError::UnknownSecret {
                database: database.logical_id.clone(),
                secret: field_ref.secret.clone(),
            })?;

        if !secret.template.has_field(&field_ref.field) {
            return Err(ValidationError::MissingSecretField {
                secret: secret.logical_id.clone(),
                field: field_ref.field.clone(),
            });
        }
    }

    // the password itself must come out of the generator, not the template
    let secret = secrets
        .iter()
        .find(|s| s.logical_id == password.secret)
        .ok_or_else(|| ValidationError::UnknownSecret {
            database: database.logical_id.clone(),
            secret: password.secret.clone(),
        })?;
    if !secret.template.is_generated(&password.field) {
        return Err(ValidationError::PasswordNotGenerated {
            secret: secret.logical_id.clone(),
            field: password.field.clone(),
        });
    }

    Ok(())
}

/// Listener port equals the port of the target group it forwards to
pub fn validate_listener_target(listener: &Listener, target_group: &TargetGroup) -> ValidationResult {
    if listener.port != target_group.port {
        return Err(ValidationError::PortMismatch {
            listener: listener.logical_id.clone(),
            listener_port: listener.port,
            target_group: target_group.logical_id.clone(),
            target_port: target_group.port,
        });
    }
    Ok(())
}

/// Health check path is absolute and the timeout fits inside the interval
pub fn validate_health_check(target_group: &TargetGroup) -> ValidationResult {
    let hc = &target_group.health_check;
    let reason = if !hc.path.starts_with('/') {
        Some(format!("path {:?} must start with '/'", hc.path))
    } else if hc.timeout.is_zero() {
        Some("timeout must be positive".to_string())
    } else if hc.timeout >= hc.interval {
        Some(format!(
            "timeout {}s must be shorter than interval {}s",
            hc.timeout.as_secs(),
            hc.interval.as_secs()
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ValidationError::InvalidHealthCheck {
            target_group: target_group.logical_id.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// The load balancer is internet-facing and sits in public subnets
pub fn validate_load_balancer_exposure(
    lb: &LoadBalancer,
    subnets: &SubnetIndex<'_>,
) -> ValidationResult {
    if !lb.internet_facing || lb.subnets.is_empty() {
        return Err(ValidationError::LoadBalancerNotPublic(lb.logical_id.clone()));
    }
    for reference in &lb.subnets {
        if !lookup_subnet(&lb.logical_id, reference, subnets)?.is_public() {
            return Err(ValidationError::LoadBalancerNotPublic(lb.logical_id.clone()));
        }
    }
    Ok(())
}

/// Stricter posture for production deployments
///
/// # Rules
/// - Automated backups retained for at least one day
/// - Database survives descriptor removal
/// - Host and database rule sets do not admit every IPv4 source
pub fn validate_production_posture(
    database: &DatabaseInstance,
    rule_sets: &[&FirewallRuleSet],
) -> ValidationResult {
    if database.backup.is_disabled() {
        return Err(ValidationError::NotProductionReady(format!(
            "database {} retains no automated backups",
            database.logical_id
        )));
    }

    if database.removal_policy == super::RemovalPolicy::Destroy {
        return Err(ValidationError::NotProductionReady(format!(
            "database {} is destroyed with the stack",
            database.logical_id
        )));
    }

    for rule_set in rule_sets {
        let sensitive = matches!(rule_set.role, FirewallRole::Host | FirewallRole::Database);
        if sensitive && rule_set.has_unrestricted_ingress() {
            return Err(ValidationError::NotProductionReady(format!(
                "{} rule set {} admits 0.0.0.0/0",
                rule_set.role, rule_set.logical_id
            )));
        }
    }

    Ok(())
}

fn lookup_subnet<'a>(
    from: &LogicalId,
    reference: &Reference,
    subnets: &SubnetIndex<'a>,
) -> Result<&'a Subnet, ValidationError> {
    subnets
        .get(reference.target())
        .copied()
        .ok_or_else(|| ValidationError::WrongReferenceKind {
            from: from.clone(),
            to: reference.target().clone(),
            expected: ResourceKind::Subnet,
        })
}
