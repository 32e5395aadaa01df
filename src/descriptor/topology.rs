// Copyright (c) 2025 - Cowboy AI, Inc.
//! The declared topology: a named, versioned set of resources

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::invariants::{self, SubnetIndex};
use crate::domain::{
    AddressSpace, ComputeInstance, CredentialSecret, DatabaseInstance, DbSubnetGroup, ElasticIp,
    ElasticPool, FirewallRole, FirewallRuleSet, InternetGateway, KeyPair, Listener, LoadBalancer,
    LogicalId, NatGateway, Reference, Resource, ResourceKind, RouteTable, Subnet, TargetGroup,
    ValidationError, ValidationResult,
};

/// Named stack output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDeclaration {
    pub name: LogicalId,
    pub value: Reference,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub export_name: Option<String>,
}

/// A complete desired-state declaration
///
/// Resources are kept in declaration order. Declaration order carries no
/// meaning for the engine; see [`crate::graph::DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    stack_name: String,
    stack_version: u32,
    description: String,
    resources: Vec<Resource>,
    outputs: Vec<OutputDeclaration>,
}

impl Topology {
    pub fn new(stack_name: impl Into<String>, stack_version: u32) -> Self {
        Self {
            stack_name: stack_name.into(),
            stack_version,
            description: String::new(),
            resources: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a resource
    pub fn declare(&mut self, resource: impl Into<Resource>) -> &mut Self {
        self.resources.push(resource.into());
        self
    }

    pub fn add_output(&mut self, output: OutputDeclaration) -> &mut Self {
        self.outputs.push(output);
        self
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn stack_version(&self) -> u32 {
        self.stack_version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn outputs(&self) -> &[OutputDeclaration] {
        &self.outputs
    }

    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id() == id)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources.iter().filter(|r| r.kind() == kind).count()
    }

    fn select<'a, T>(&'a self, pick: impl Fn(&'a Resource) -> Option<&'a T>) -> Vec<&'a T> {
        self.resources.iter().filter_map(pick).collect()
    }

    pub fn address_space(&self) -> Option<&AddressSpace> {
        self.resources.iter().find_map(|r| match r {
            Resource::Vpc(v) => Some(v),
            _ => None,
        })
    }

    pub fn subnets(&self) -> Vec<&Subnet> {
        self.select(|r| match r {
            Resource::Subnet(s) => Some(s),
            _ => None,
        })
    }

    pub fn public_subnets(&self) -> Vec<&Subnet> {
        self.subnets().into_iter().filter(|s| s.is_public()).collect()
    }

    pub fn private_subnets(&self) -> Vec<&Subnet> {
        self.subnets().into_iter().filter(|s| !s.is_public()).collect()
    }

    pub fn internet_gateways(&self) -> Vec<&InternetGateway> {
        self.select(|r| match r {
            Resource::InternetGateway(g) => Some(g),
            _ => None,
        })
    }

    pub fn elastic_ips(&self) -> Vec<&ElasticIp> {
        self.select(|r| match r {
            Resource::ElasticIp(e) => Some(e),
            _ => None,
        })
    }

    pub fn nat_gateways(&self) -> Vec<&NatGateway> {
        self.select(|r| match r {
            Resource::NatGateway(n) => Some(n),
            _ => None,
        })
    }

    pub fn route_tables(&self) -> Vec<&RouteTable> {
        self.select(|r| match r {
            Resource::RouteTable(t) => Some(t),
            _ => None,
        })
    }

    pub fn rule_sets(&self) -> Vec<&FirewallRuleSet> {
        self.select(|r| match r {
            Resource::SecurityGroup(g) => Some(g),
            _ => None,
        })
    }

    /// The rule set owned by `role`, if exactly one is declared
    pub fn rule_set_for(&self, role: FirewallRole) -> Option<&FirewallRuleSet> {
        let mut matching = self.rule_sets().into_iter().filter(|rs| rs.role == role);
        match (matching.next(), matching.next()) {
            (Some(rs), None) => Some(rs),
            _ => None,
        }
    }

    pub fn key_pairs(&self) -> Vec<&KeyPair> {
        self.select(|r| match r {
            Resource::KeyPair(k) => Some(k),
            _ => None,
        })
    }

    pub fn instances(&self) -> Vec<&ComputeInstance> {
        self.select(|r| match r {
            Resource::Instance(i) => Some(i),
            _ => None,
        })
    }

    pub fn pools(&self) -> Vec<&ElasticPool> {
        self.select(|r| match r {
            Resource::AutoScalingGroup(p) => Some(p),
            _ => None,
        })
    }

    pub fn load_balancers(&self) -> Vec<&LoadBalancer> {
        self.select(|r| match r {
            Resource::LoadBalancer(lb) => Some(lb),
            _ => None,
        })
    }

    pub fn listeners(&self) -> Vec<&Listener> {
        self.select(|r| match r {
            Resource::Listener(l) => Some(l),
            _ => None,
        })
    }

    pub fn target_groups(&self) -> Vec<&TargetGroup> {
        self.select(|r| match r {
            Resource::TargetGroup(t) => Some(t),
            _ => None,
        })
    }

    pub fn secrets(&self) -> Vec<&CredentialSecret> {
        self.select(|r| match r {
            Resource::Secret(s) => Some(s),
            _ => None,
        })
    }

    pub fn db_subnet_groups(&self) -> Vec<&DbSubnetGroup> {
        self.select(|r| match r {
            Resource::DbSubnetGroup(g) => Some(g),
            _ => None,
        })
    }

    pub fn databases(&self) -> Vec<&DatabaseInstance> {
        self.select(|r| match r {
            Resource::DatabaseInstance(d) => Some(d),
            _ => None,
        })
    }

    /// Check every structural invariant, returning the first violation
    pub fn validate(&self) -> ValidationResult {
        self.validate_identity()?;
        self.validate_network()?;
        self.validate_access_control()?;
        self.validate_placement()?;
        self.validate_data()?;
        self.validate_traffic()?;
        Ok(())
    }

    /// [`validate`](Self::validate) plus the production posture rules
    pub fn validate_production_readiness(&self) -> ValidationResult {
        self.validate()?;
        let rule_sets = self.rule_sets();
        for database in self.databases() {
            invariants::validate_production_posture(database, &rule_sets)?;
        }
        Ok(())
    }

    /// Human-readable notes on a posture that is valid but not production-safe
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for database in self.databases() {
            if database.is_disposable() {
                warnings.push(format!(
                    "Database {} retains no automated backups and is deleted with the stack; not production-safe",
                    database.logical_id
                ));
            }
        }

        for rule_set in self.rule_sets() {
            if rule_set.role != FirewallRole::LoadBalancer && rule_set.has_unrestricted_ingress() {
                warnings.push(format!(
                    "Rule set {} ({}) admits ingress from 0.0.0.0/0",
                    rule_set.logical_id, rule_set.role
                ));
            }
        }

        warnings
    }

    fn subnet_index(&self) -> SubnetIndex<'_> {
        self.subnets()
            .into_iter()
            .map(|s| (&s.logical_id, s))
            .collect()
    }

    fn expect_count(&self, kind: ResourceKind, expected: usize) -> ValidationResult {
        let actual = self.count(kind);
        if actual != expected {
            return Err(ValidationError::Cardinality {
                kind,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn validate_identity(&self) -> ValidationResult {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.logical_id()) {
                return Err(ValidationError::DuplicateLogicalId(
                    resource.logical_id().clone(),
                ));
            }
        }

        for resource in &self.resources {
            for dependency in resource.dependencies() {
                if !seen.contains(dependency) {
                    return Err(ValidationError::DanglingReference {
                        from: resource.logical_id().clone(),
                        to: dependency.clone(),
                    });
                }
            }
        }

        for output in &self.outputs {
            if !seen.contains(output.value.target()) {
                return Err(ValidationError::DanglingReference {
                    from: output.name.clone(),
                    to: output.value.target().clone(),
                });
            }
        }

        for kind in [
            ResourceKind::Vpc,
            ResourceKind::InternetGateway,
            ResourceKind::LoadBalancer,
            ResourceKind::Listener,
            ResourceKind::TargetGroup,
            ResourceKind::DatabaseInstance,
        ] {
            self.expect_count(kind, 1)?;
        }

        Ok(())
    }

    fn validate_network(&self) -> ValidationResult {
        let Some(space) = self.address_space() else {
            return Err(ValidationError::Cardinality {
                kind: ResourceKind::Vpc,
                expected: 1,
                actual: 0,
            });
        };

        let subnets = self.subnets();
        invariants::validate_subnet_layout(&space.cidr, &subnets)?;
        for subnet in &subnets {
            invariants::validate_subnet_addressing(subnet)?;
        }

        let zones: HashSet<_> = subnets.iter().map(|s| &s.zone).collect();
        let nat_gateways = self.nat_gateways();
        invariants::validate_nat_gateway_count(nat_gateways.len(), zones.len())?;

        let index = self.subnet_index();
        for nat in &nat_gateways {
            invariants::validate_nat_placement(nat, &index)?;
        }

        invariants::validate_routing(&subnets, &self.route_tables())
    }

    fn validate_access_control(&self) -> ValidationResult {
        let rule_sets = self.rule_sets();
        invariants::validate_rule_set_roles(&rule_sets)?;
        for rule_set in &rule_sets {
            invariants::validate_single_pair(rule_set)?;
        }

        for instance in self.instances() {
            invariants::validate_rule_set_attachment(
                &instance.logical_id,
                FirewallRole::Host,
                &instance.security_group,
                &rule_sets,
            )?;
        }

        for lb in self.load_balancers() {
            invariants::validate_rule_set_attachment(
                &lb.logical_id,
                FirewallRole::LoadBalancer,
                &lb.security_group,
                &rule_sets,
            )?;
        }

        for database in self.databases() {
            for group in &database.security_groups {
                invariants::validate_rule_set_attachment(
                    &database.logical_id,
                    FirewallRole::Database,
                    group,
                    &rule_sets,
                )?;
            }
        }

        Ok(())
    }

    fn validate_placement(&self) -> ValidationResult {
        let index = self.subnet_index();

        for instance in self.instances() {
            invariants::validate_instance_placement(instance, &index)?;
        }
        for pool in self.pools() {
            invariants::validate_pool_placement(pool, &index)?;
            invariants::validate_pool_capacity(pool)?;
        }
        for lb in self.load_balancers() {
            invariants::validate_load_balancer_exposure(lb, &index)?;
        }

        let groups: HashMap<_, _> = self
            .db_subnet_groups()
            .into_iter()
            .map(|g| (&g.logical_id, g))
            .collect();

        for database in self.databases() {
            let group = groups.get(database.subnet_group.target()).ok_or_else(|| {
                ValidationError::WrongReferenceKind {
                    from: database.logical_id.clone(),
                    to: database.subnet_group.target().clone(),
                    expected: ResourceKind::DbSubnetGroup,
                }
            })?;
            invariants::validate_database_placement(database, group, &index)?;
        }

        Ok(())
    }

    fn validate_data(&self) -> ValidationResult {
        let secrets = self.secrets();
        for database in self.databases() {
            invariants::validate_credentials(database, &secrets)?;
        }
        Ok(())
    }

    fn validate_traffic(&self) -> ValidationResult {
        let target_groups = self.target_groups();

        for tg in &target_groups {
            invariants::validate_health_check(tg)?;
        }

        for listener in self.listeners() {
            let tg = target_groups
                .iter()
                .find(|tg| &tg.logical_id == listener.default_target_group.target())
                .ok_or_else(|| ValidationError::WrongReferenceKind {
                    from: listener.logical_id.clone(),
                    to: listener.default_target_group.target().clone(),
                    expected: ResourceKind::TargetGroup,
                })?;
            invariants::validate_listener_target(listener, tg)?;
        }

        for pool in self.pools() {
            for reference in &pool.target_groups {
                if !target_groups.iter().any(|tg| &tg.logical_id == reference.target()) {
                    return Err(ValidationError::WrongReferenceKind {
                        from: pool.logical_id.clone(),
                        to: reference.target().clone(),
                        expected: ResourceKind::TargetGroup,
                    });
                }
            }
        }

        Ok(())
    }
}
