// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reference topology construction
//!
//! Declares the whole reference stack from one [`StackConfig`], block by
//! block, leaves first. Nothing here talks to a cloud API; the result is
//! validated before it is returned.

use tracing::{debug, info, warn};

use crate::config::StackConfig;
use crate::domain::invariants;
use crate::domain::{
    plan_subnets, AddressSpace, ApplicationProtocol, ComputeInstance, CredentialSecret,
    Credentials, DatabaseInstance, DbSubnetGroup, ElasticIp, ElasticPool, FirewallRole,
    FirewallRuleSet, GenerationConstraints, IngressRule, InternetGateway, KeyPair, Listener,
    LoadBalancer, LogicalId, NatGateway, Reference, ResourceKind, RouteTable, RouteTarget,
    SecretTemplate, Subnet, SubnetGroup, SubnetType, TargetGroup, TargetType, ValidationError,
};
use crate::errors::TopologyResult;

use super::{OutputDeclaration, Topology};

/// Builds the reference web topology
///
/// # Examples
///
/// ```rust
/// use cim_topology::config::StackConfig;
/// use cim_topology::descriptor::TopologyDescriptor;
///
/// let topology = TopologyDescriptor::build(&StackConfig::default()).unwrap();
/// assert_eq!(topology.public_subnets().len(), 2);
/// assert_eq!(topology.private_subnets().len(), 2);
/// assert_eq!(topology.nat_gateways().len(), 1);
/// ```
pub struct TopologyDescriptor;

impl TopologyDescriptor {
    /// Declare every resource of the reference stack and validate the result
    pub fn build(config: &StackConfig) -> TopologyResult<Topology> {
        info!(
            stack = %config.stack_name,
            version = config.stack_version,
            cidr = %config.cidr,
            zones = config.max_azs,
            "Building topology"
        );

        let mut declarations = Declarations::new(config)?;
        declarations.network()?;
        declarations.access_control()?;
        declarations.compute()?;
        declarations.traffic()?;
        declarations.data()?;
        declarations.outputs()?;

        let topology = declarations.topology;
        topology.validate()?;

        for warning in topology.warnings() {
            warn!("{}", warning);
        }

        info!(
            stack = %topology.stack_name(),
            resources = topology.resources().len(),
            "Topology built"
        );
        Ok(topology)
    }
}

/// Working state while the stack is declared
struct Declarations<'a> {
    config: &'a StackConfig,
    topology: Topology,
    vpc: LogicalId,
    public_subnets: Vec<LogicalId>,
    private_subnets: Vec<LogicalId>,
    rule_sets: Vec<(FirewallRole, LogicalId)>,
    target_group: Option<LogicalId>,
    load_balancer: Option<LogicalId>,
}

impl<'a> Declarations<'a> {
    fn new(config: &'a StackConfig) -> TopologyResult<Self> {
        let topology = Topology::new(&config.stack_name, config.stack_version).with_description(
            "Web topology: VPC with public and private subnets, load-balanced auto-scaling group, MySQL database",
        );
        Ok(Self {
            config,
            topology,
            vpc: LogicalId::new("Vpc")?,
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
            rule_sets: Vec::new(),
            target_group: None,
            load_balancer: None,
        })
    }

    fn vpc_ref(&self) -> Reference {
        Reference::to(&self.vpc)
    }

    fn rule_set(&self, role: FirewallRole) -> TopologyResult<Reference> {
        self.rule_sets
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, id)| Reference::to(id))
            .ok_or_else(|| ValidationError::RuleSetCountForRole { role, count: 0 }.into())
    }

    fn network(&mut self) -> TopologyResult<()> {
        let config = self.config;
        let zones = config.zones()?;
        invariants::validate_nat_gateway_count(config.nat_gateways, zones.len())?;

        self.topology.declare(AddressSpace {
            logical_id: self.vpc.clone(),
            name: config.physical_name(&format!("{}/Vpc", config.stack_name)),
            cidr: config.cidr,
            max_azs: config.max_azs,
            nat_gateways: config.nat_gateways,
            enable_dns_hostnames: true,
            enable_dns_support: true,
        });

        let groups = [
            SubnetGroup::new("Public", SubnetType::Public, config.public_subnet_mask),
            SubnetGroup::new(
                "Private",
                SubnetType::PrivateWithEgress,
                config.private_subnet_mask,
            ),
        ];

        for planned in plan_subnets(&config.cidr, &groups, &zones)? {
            let id = self
                .vpc
                .child(format!("{}Subnet{}", planned.group, planned.ordinal))?;
            debug!(subnet = %id, cidr = %planned.cidr, zone = %planned.zone, "Planned subnet");

            match planned.subnet_type {
                SubnetType::Public => self.public_subnets.push(id.clone()),
                SubnetType::PrivateWithEgress => self.private_subnets.push(id.clone()),
            }

            self.topology.declare(Subnet {
                logical_id: id,
                group: planned.group,
                subnet_type: planned.subnet_type,
                zone: planned.zone,
                cidr: planned.cidr,
                map_public_ip_on_launch: planned.subnet_type.maps_public_ip(),
                vpc: self.vpc_ref(),
            });
        }

        let igw = self.vpc.child("InternetGateway")?;
        self.topology.declare(InternetGateway {
            logical_id: igw.clone(),
            vpc: self.vpc_ref(),
        });

        // NAT gateways fill the public subnets in zone order
        let mut nat_gateways = Vec::with_capacity(config.nat_gateways);
        for (i, public) in self.public_subnets.iter().take(config.nat_gateways).enumerate() {
            let nat = self.vpc.child(format!("NatGateway{}", i + 1))?;
            let eip = nat.child("Eip")?;

            self.topology.declare(ElasticIp {
                logical_id: eip.clone(),
                internet_gateway: Reference::to(&igw),
            });
            self.topology.declare(NatGateway {
                logical_id: nat.clone(),
                subnet: Reference::to(public),
                allocation: Reference::attribute(&eip, "AllocationId"),
            });
            nat_gateways.push(nat);
        }

        for subnet in &self.public_subnets {
            self.topology.declare(RouteTable {
                logical_id: subnet.child("RouteTable")?,
                vpc: Reference::to(&self.vpc),
                subnet: Reference::to(subnet),
                default_route: RouteTarget::InternetGateway(Reference::to(&igw)),
            });
        }

        // private subnets share the NAT gateways round-robin
        for (j, subnet) in self.private_subnets.iter().enumerate() {
            let nat = &nat_gateways[j % nat_gateways.len()];
            self.topology.declare(RouteTable {
                logical_id: subnet.child("RouteTable")?,
                vpc: Reference::to(&self.vpc),
                subnet: Reference::to(subnet),
                default_route: RouteTarget::NatGateway(Reference::to(nat)),
            });
        }

        info!(
            public = self.public_subnets.len(),
            private = self.private_subnets.len(),
            nat_gateways = nat_gateways.len(),
            "Network block declared"
        );
        Ok(())
    }

    fn access_control(&mut self) -> TopologyResult<()> {
        let config = self.config;
        let declared = [
            (
                FirewallRole::Host,
                "HostSecurityGroup",
                "allow-ssh-sg",
                IngressRule::tcp(config.ssh_source, 22, "Allow SSH access"),
            ),
            (
                FirewallRole::LoadBalancer,
                "LoadBalancerSecurityGroup",
                "allow-http",
                IngressRule::tcp(config.http_source, config.http_port, "Allow HTTP access"),
            ),
            (
                FirewallRole::Database,
                "DatabaseSecurityGroup",
                "allow-SQL",
                IngressRule::tcp(
                    config.db_source,
                    config.database_engine.port(),
                    "Allow SQL access",
                ),
            ),
        ];

        for (role, id, group_name, rule) in declared {
            let id = LogicalId::new(id)?;
            let rule_set = FirewallRuleSet::new(
                id.clone(),
                config.physical_name(group_name),
                role,
                self.vpc_ref(),
            )
            .allow(rule);
            let rule_set = match role {
                FirewallRole::Database => rule_set.with_egress(config.database_egress),
                _ => rule_set,
            };

            if rule_set.has_unrestricted_ingress() && role != FirewallRole::LoadBalancer {
                debug!(rule_set = %id, %role, "Rule set admits any source");
            }

            self.topology.declare(rule_set);
            self.rule_sets.push((role, id));
        }

        Ok(())
    }

    fn compute(&mut self) -> TopologyResult<()> {
        let config = self.config;
        let key_pair = LogicalId::new("KeyPair")?;
        self.topology.declare(KeyPair {
            logical_id: key_pair.clone(),
            key_name: config.physical_name(&config.key_name),
        });

        let host_rules = self.rule_set(FirewallRole::Host)?;
        let placements = [
            ("PublicInstance", "public-EC2", SubnetType::Public),
            ("PrivateInstance", "private-EC2", SubnetType::PrivateWithEgress),
        ];

        for (id, name, placement) in placements {
            let subnets = match placement {
                SubnetType::Public => &self.public_subnets,
                SubnetType::PrivateWithEgress => &self.private_subnets,
            };
            let subnet = subnets.first().ok_or(ValidationError::Cardinality {
                kind: ResourceKind::Subnet,
                expected: 1,
                actual: 0,
            })?;

            self.topology.declare(ComputeInstance {
                logical_id: LogicalId::new(id)?,
                name: config.physical_name(name),
                instance_type: config.instance_type,
                image: config.image.clone(),
                subnet: Reference::to(subnet),
                placement,
                security_group: host_rules.clone(),
                key_pair: Some(Reference::to(&key_pair)),
                associate_public_ip: placement.maps_public_ip(),
            });
        }

        let target_group = LogicalId::new("WebTargetGroup")?;
        self.topology.declare(TargetGroup {
            logical_id: target_group.clone(),
            name: config.physical_name("target"),
            port: config.http_port,
            protocol: ApplicationProtocol::Http,
            target_type: TargetType::Instance,
            vpc: self.vpc_ref(),
            health_check: config.health_check.clone(),
            deregistration_delay: config.deregistration_delay,
        });

        self.topology.declare(ElasticPool {
            logical_id: LogicalId::new("WebPool")?,
            instance_type: config.instance_type,
            image: config.pool_image.clone(),
            subnets: self.private_subnets.iter().map(Reference::to).collect(),
            placement: SubnetType::PrivateWithEgress,
            capacity: config.pool_capacity,
            target_groups: vec![Reference::to(&target_group)],
        });

        self.target_group = Some(target_group);
        Ok(())
    }

    fn traffic(&mut self) -> TopologyResult<()> {
        let config = self.config;
        let load_balancer = LogicalId::new("LoadBalancer")?;

        self.topology.declare(LoadBalancer {
            logical_id: load_balancer.clone(),
            internet_facing: true,
            subnets: self.public_subnets.iter().map(Reference::to).collect(),
            security_group: self.rule_set(FirewallRole::LoadBalancer)?,
        });

        if let Some(target_group) = &self.target_group {
            self.topology.declare(Listener {
                logical_id: LogicalId::new("WebListener")?,
                load_balancer: Reference::to(&load_balancer),
                port: config.http_port,
                protocol: ApplicationProtocol::Http,
                default_target_group: Reference::to(target_group),
            });
        }

        self.load_balancer = Some(load_balancer);
        Ok(())
    }

    fn data(&mut self) -> TopologyResult<()> {
        let config = self.config;

        let constraints =
            GenerationConstraints::new(config.password_length)?.excluding_punctuation();
        let secret = CredentialSecret {
            logical_id: LogicalId::new("DatabaseMasterUserSecret")?,
            secret_name: config.physical_name(&config.secret_name),
            description: "Database master user credentials".to_string(),
            template: SecretTemplate::username_password(&config.secret_username, constraints)?,
        };

        let field = |name: &str| {
            secret
                .field(name)
                .ok_or_else(|| ValidationError::MissingSecretField {
                    secret: secret.logical_id.clone(),
                    field: name.to_string(),
                })
        };
        let credentials = Credentials::FromSecret {
            username: field("username")?,
            password: field(secret.template.generated_field.as_str())?,
        };

        let subnet_group = LogicalId::new("DatabaseSubnetGroup")?;
        self.topology.declare(secret);
        self.topology.declare(DbSubnetGroup {
            logical_id: subnet_group.clone(),
            description: format!("Private subnets for the {} database", config.database_name),
            subnets: self.private_subnets.iter().map(Reference::to).collect(),
        });

        self.topology.declare(DatabaseInstance {
            logical_id: LogicalId::new("Database")?,
            database_name: config.database_name.clone(),
            engine: config.database_engine.clone(),
            instance_type: config.database_instance_type,
            allocated_storage_gb: config.allocated_storage_gb,
            subnet_group: Reference::to(&subnet_group),
            placement: SubnetType::PrivateWithEgress,
            publicly_accessible: false,
            security_groups: vec![self.rule_set(FirewallRole::Database)?],
            credentials,
            backup: config.backup,
            removal_policy: config.removal_policy,
        });

        Ok(())
    }

    fn outputs(&mut self) -> TopologyResult<()> {
        if !self.config.export_outputs {
            return Ok(());
        }
        if let Some(load_balancer) = &self.load_balancer {
            self.topology.add_output(OutputDeclaration {
                name: LogicalId::new("LoadBalancerDnsName")?,
                value: Reference::attribute(load_balancer, "DNSName"),
                description: "Public DNS name of the load balancer".to_string(),
                export_name: Some(self.config.physical_name(&format!(
                    "{}-LoadBalancerDnsName",
                    self.config.stack_name
                ))),
            });
        }
        Ok(())
    }
}
