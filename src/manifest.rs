// Copyright (c) 2025 - Cowboy AI, Inc.
//! Desired-state manifest
//!
//! Renders a [`Topology`] into the CloudFormation-shaped JSON document the
//! reconciliation engine applies. Rendering is pure: the same topology always
//! yields byte-identical JSON (every map is ordered by key).
//!
//! A few declared resources expand into several engine resources:
//!
//! | Declared | Rendered |
//! |---|---|
//! | internet gateway | gateway + `…Attachment` |
//! | route table | table + `…DefaultRoute` + `…Association` |
//! | elastic pool | `…LaunchTemplate` + auto-scaling group |
//!
//! Secret-backed credentials are rendered as `{{resolve:secretsmanager:…}}`
//! dynamic references. No generated value ever appears in a manifest.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::descriptor::{OutputDeclaration, Topology};
use crate::domain::{
    AddressSpace, ComputeInstance, CredentialSecret, Credentials, DatabaseInstance,
    DbSubnetGroup, EgressPolicy, ElasticPool, FirewallRuleSet, Listener, LoadBalancer,
    LogicalId, MachineImage, NatGateway, Reference, Resource, RouteTable, RouteTarget,
    SecretFieldRef, Subnet, TargetGroup,
};
use crate::errors::TopologyResult;
use crate::graph::DependencyGraph;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// One engine resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties")]
    pub properties: Value,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<String>,

    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none", default)]
    pub deletion_policy: Option<String>,

    #[serde(
        rename = "UpdateReplacePolicy",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub update_replace_policy: Option<String>,
}

impl ManifestResource {
    fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    fn depending_on(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.depends_on.extend(ids);
        self.depends_on.sort();
        self.depends_on.dedup();
        self
    }

    fn with_deletion_policy(mut self, policy: &str) -> Self {
        self.deletion_policy = Some(policy.to_string());
        self.update_replace_policy = Some(policy.to_string());
        self
    }
}

/// Stack identity and build notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(rename = "StackName")]
    pub stack_name: String,

    #[serde(rename = "StackVersion")]
    pub stack_version: u32,

    #[serde(rename = "Warnings", skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,

    /// Declared resources in dependency order
    #[serde(rename = "ApplyOrder")]
    pub apply_order: Vec<String>,
}

/// Rendered desired-state document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Metadata")]
    pub metadata: ManifestMetadata,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, ManifestResource>,

    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty", default)]
    pub outputs: BTreeMap<String, Value>,
}

impl Manifest {
    /// Render a topology
    ///
    /// Fails if the topology holds a dangling reference or a dependency cycle.
    pub fn render(topology: &Topology) -> TopologyResult<Self> {
        let graph = DependencyGraph::from_topology(topology)?;
        let apply_order = graph.apply_order()?;

        let mut resources = BTreeMap::new();
        for resource in topology.resources() {
            let id = resource.logical_id();
            let depends_on = graph
                .dependencies_of(id)
                .into_iter()
                .map(|dep| dep.to_string());

            for (name, rendered) in render_resource(topology, resource) {
                let rendered = if &name == id.as_str() {
                    rendered.depending_on(depends_on.clone())
                } else {
                    rendered
                };
                resources.insert(name, rendered);
            }
        }

        let outputs = topology
            .outputs()
            .iter()
            .map(|o| (o.name.to_string(), render_output(o)))
            .collect();

        debug!(
            stack = %topology.stack_name(),
            declared = topology.resources().len(),
            rendered = resources.len(),
            "Rendered manifest"
        );

        Ok(Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: topology.description().to_string(),
            metadata: ManifestMetadata {
                stack_name: topology.stack_name().to_string(),
                stack_version: topology.stack_version(),
                warnings: topology.warnings(),
                apply_order: apply_order.iter().map(LogicalId::to_string).collect(),
            },
            resources,
            outputs,
        })
    }

    pub fn stack_name(&self) -> &str {
        &self.metadata.stack_name
    }

    pub fn stack_version(&self) -> u32 {
        self.metadata.stack_version
    }

    pub fn resource(&self, name: &str) -> Option<&ManifestResource> {
        self.resources.get(name)
    }

    /// Rendered resources of one engine type, by name
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a ManifestResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn to_value(&self) -> TopologyResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn reference(r: &Reference) -> Value {
    match &r.attribute {
        None => json!({ "Ref": r.target.as_str() }),
        Some(attr) => json!({ "Fn::GetAtt": [r.target.as_str(), attr] }),
    }
}

fn group_id(r: &Reference) -> Value {
    json!({ "Fn::GetAtt": [r.target.as_str(), "GroupId"] })
}

fn refs(references: &[Reference]) -> Value {
    Value::Array(references.iter().map(reference).collect())
}

fn name_tag(topology: &Topology, id: &LogicalId) -> Value {
    json!([{ "Key": "Name", "Value": format!("{}/{}", topology.stack_name(), id) }])
}

/// `{{resolve:secretsmanager:<secret>:SecretString:<field>::}}`
fn secret_field(field: &SecretFieldRef) -> Value {
    json!({
        "Fn::Join": ["", [
            "{{resolve:secretsmanager:",
            { "Ref": field.secret.as_str() },
            format!(":SecretString:{}::}}}}", field.field),
        ]]
    })
}

fn image_id(image: &MachineImage) -> Value {
    match image {
        MachineImage::LatestAmazonLinux { .. } => match image.parameter_path() {
            Some(path) => json!(format!("{{{{resolve:ssm:{}}}}}", path)),
            None => Value::Null,
        },
        MachineImage::Ami { image_id } => json!(image_id),
    }
}

fn render_resource(topology: &Topology, resource: &Resource) -> Vec<(String, ManifestResource)> {
    let id = resource.logical_id();
    let name = id.to_string();

    match resource {
        Resource::Vpc(r) => vec![(name, vpc(r))],
        Resource::Subnet(r) => vec![(name, subnet(topology, r))],
        Resource::InternetGateway(r) => vec![
            (
                name.clone(),
                ManifestResource::new(
                    "AWS::EC2::InternetGateway",
                    json!({ "Tags": name_tag(topology, id) }),
                ),
            ),
            (
                format!("{}Attachment", name),
                ManifestResource::new(
                    "AWS::EC2::VPCGatewayAttachment",
                    json!({
                        "VpcId": reference(&r.vpc),
                        "InternetGatewayId": { "Ref": name },
                    }),
                ),
            ),
        ],
        Resource::ElasticIp(r) => vec![(
            name,
            ManifestResource::new(
                "AWS::EC2::EIP",
                json!({ "Domain": "vpc", "Tags": name_tag(topology, id) }),
            )
            .depending_on([format!("{}Attachment", r.internet_gateway.target())]),
        )],
        Resource::NatGateway(r) => vec![(name, nat_gateway(topology, r))],
        Resource::RouteTable(r) => route_table(topology, r),
        Resource::SecurityGroup(r) => vec![(name, security_group(r))],
        Resource::KeyPair(r) => vec![(
            name,
            ManifestResource::new("AWS::EC2::KeyPair", json!({ "KeyName": r.key_name })),
        )],
        Resource::Instance(r) => vec![(name, instance(r))],
        Resource::AutoScalingGroup(r) => elastic_pool(r),
        Resource::LoadBalancer(r) => vec![(name, load_balancer(r))],
        Resource::Listener(r) => vec![(name, listener(r))],
        Resource::TargetGroup(r) => vec![(name, target_group(r))],
        Resource::Secret(r) => vec![(name, secret(r))],
        Resource::DbSubnetGroup(r) => vec![(name, db_subnet_group(r))],
        Resource::DatabaseInstance(r) => vec![(name, database(r))],
    }
}

fn vpc(r: &AddressSpace) -> ManifestResource {
    ManifestResource::new(
        "AWS::EC2::VPC",
        json!({
            "CidrBlock": r.cidr.to_string(),
            "EnableDnsHostnames": r.enable_dns_hostnames,
            "EnableDnsSupport": r.enable_dns_support,
            "InstanceTenancy": "default",
            "Tags": [{ "Key": "Name", "Value": r.name }],
        }),
    )
}

fn subnet(topology: &Topology, r: &Subnet) -> ManifestResource {
    ManifestResource::new(
        "AWS::EC2::Subnet",
        json!({
            "VpcId": reference(&r.vpc),
            "CidrBlock": r.cidr.to_string(),
            "AvailabilityZone": r.zone.as_str(),
            "MapPublicIpOnLaunch": r.map_public_ip_on_launch,
            "Tags": [
                { "Key": "Name", "Value": format!("{}/{}", topology.stack_name(), r.logical_id) },
                { "Key": "subnet-type", "Value": r.subnet_type.to_string() },
            ],
        }),
    )
}

fn nat_gateway(topology: &Topology, r: &NatGateway) -> ManifestResource {
    ManifestResource::new(
        "AWS::EC2::NatGateway",
        json!({
            "SubnetId": reference(&r.subnet),
            "AllocationId": reference(&r.allocation),
            "Tags": name_tag(topology, &r.logical_id),
        }),
    )
}

fn route_table(topology: &Topology, r: &RouteTable) -> Vec<(String, ManifestResource)> {
    let name = r.logical_id.to_string();

    let mut route = json!({
        "RouteTableId": { "Ref": name },
        "DestinationCidrBlock": "0.0.0.0/0",
    });
    let mut route_depends_on = Vec::new();
    match &r.default_route {
        RouteTarget::InternetGateway(igw) => {
            route["GatewayId"] = reference(igw);
            route_depends_on.push(format!("{}Attachment", igw.target()));
        }
        RouteTarget::NatGateway(nat) => {
            route["NatGatewayId"] = reference(nat);
        }
    }

    vec![
        (
            name.clone(),
            ManifestResource::new(
                "AWS::EC2::RouteTable",
                json!({
                    "VpcId": reference(&r.vpc),
                    "Tags": name_tag(topology, &r.logical_id),
                }),
            ),
        ),
        (
            format!("{}DefaultRoute", name),
            ManifestResource::new("AWS::EC2::Route", route).depending_on(route_depends_on),
        ),
        (
            format!("{}Association", name),
            ManifestResource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "RouteTableId": { "Ref": name },
                    "SubnetId": reference(&r.subnet),
                }),
            ),
        ),
    ]
}

fn security_group(r: &FirewallRuleSet) -> ManifestResource {
    let ingress: Vec<Value> = r
        .ingress
        .iter()
        .map(|rule| {
            json!({
                "CidrIp": rule.peer.to_string(),
                "IpProtocol": rule.protocol.to_string(),
                "FromPort": rule.ports.from,
                "ToPort": rule.ports.to,
                "Description": rule.description,
            })
        })
        .collect();

    let egress = match r.egress {
        EgressPolicy::AllowAll => json!([{
            "CidrIp": "0.0.0.0/0",
            "IpProtocol": "-1",
            "Description": "Allow all outbound traffic by default",
        }]),
        // the engine needs one rule that can never match to drop its default allow-all
        EgressPolicy::DenyAll => json!([{
            "CidrIp": "255.255.255.255/32",
            "IpProtocol": "icmp",
            "FromPort": 252,
            "ToPort": 86,
            "Description": "Disallow all traffic",
        }]),
    };

    ManifestResource::new(
        "AWS::EC2::SecurityGroup",
        json!({
            "GroupName": r.group_name,
            "GroupDescription": r.description,
            "VpcId": reference(&r.vpc),
            "SecurityGroupIngress": ingress,
            "SecurityGroupEgress": egress,
        }),
    )
}

fn instance(r: &ComputeInstance) -> ManifestResource {
    let mut properties = json!({
        "InstanceType": r.instance_type.to_string(),
        "ImageId": image_id(&r.image),
        "Tags": [{ "Key": "Name", "Value": r.name }],
    });

    if let Some(key_pair) = &r.key_pair {
        properties["KeyName"] = reference(key_pair);
    }

    if r.associate_public_ip {
        properties["NetworkInterfaces"] = json!([{
            "AssociatePublicIpAddress": true,
            "DeviceIndex": "0",
            "SubnetId": reference(&r.subnet),
            "GroupSet": [group_id(&r.security_group)],
        }]);
    } else {
        properties["SubnetId"] = reference(&r.subnet);
        properties["SecurityGroupIds"] = json!([group_id(&r.security_group)]);
    }

    ManifestResource::new("AWS::EC2::Instance", properties)
}

fn elastic_pool(r: &ElasticPool) -> Vec<(String, ManifestResource)> {
    let name = r.logical_id.to_string();
    let template = format!("{}LaunchTemplate", name);

    let mut properties = json!({
        "MinSize": r.capacity.min.to_string(),
        "MaxSize": r.capacity.max.to_string(),
        "VPCZoneIdentifier": refs(&r.subnets),
        "TargetGroupARNs": refs(&r.target_groups),
        "LaunchTemplate": {
            "LaunchTemplateId": { "Ref": template },
            "Version": { "Fn::GetAtt": [template, "LatestVersionNumber"] },
        },
    });
    if let Some(desired) = r.capacity.desired {
        properties["DesiredCapacity"] = json!(desired.to_string());
    }

    vec![
        (
            template.clone(),
            ManifestResource::new(
                "AWS::EC2::LaunchTemplate",
                json!({
                    "LaunchTemplateData": {
                        "ImageId": image_id(&r.image),
                        "InstanceType": r.instance_type.to_string(),
                    },
                }),
            ),
        ),
        (
            name,
            ManifestResource::new("AWS::AutoScaling::AutoScalingGroup", properties),
        ),
    ]
}

fn load_balancer(r: &LoadBalancer) -> ManifestResource {
    let scheme = if r.internet_facing {
        "internet-facing"
    } else {
        "internal"
    };
    ManifestResource::new(
        "AWS::ElasticLoadBalancingV2::LoadBalancer",
        json!({
            "Type": "application",
            "Scheme": scheme,
            "Subnets": refs(&r.subnets),
            "SecurityGroups": [group_id(&r.security_group)],
        }),
    )
}

fn listener(r: &Listener) -> ManifestResource {
    ManifestResource::new(
        "AWS::ElasticLoadBalancingV2::Listener",
        json!({
            "LoadBalancerArn": reference(&r.load_balancer),
            "Port": r.port,
            "Protocol": r.protocol.to_string(),
            "DefaultActions": [{
                "Type": "forward",
                "TargetGroupArn": reference(&r.default_target_group),
            }],
        }),
    )
}

fn target_group(r: &TargetGroup) -> ManifestResource {
    ManifestResource::new(
        "AWS::ElasticLoadBalancingV2::TargetGroup",
        json!({
            "Name": r.name,
            "Port": r.port,
            "Protocol": r.protocol.to_string(),
            "TargetType": r.target_type.as_str(),
            "VpcId": reference(&r.vpc),
            "HealthCheckPath": r.health_check.path,
            "HealthCheckIntervalSeconds": r.health_check.interval.as_secs(),
            "HealthCheckTimeoutSeconds": r.health_check.timeout.as_secs(),
            "TargetGroupAttributes": [{
                "Key": "deregistration_delay.timeout_seconds",
                "Value": r.deregistration_delay.as_secs().to_string(),
            }],
        }),
    )
}

fn secret(r: &CredentialSecret) -> ManifestResource {
    let constraints = &r.template.constraints;
    let mut generate = json!({
        "SecretStringTemplate": r.template.template_string(),
        "GenerateStringKey": r.template.generated_field,
        "PasswordLength": constraints.length,
        "ExcludePunctuation": constraints.exclude_punctuation,
        "IncludeSpace": constraints.include_space,
    });
    if !constraints.exclude_characters.is_empty() {
        generate["ExcludeCharacters"] = json!(constraints.exclude_characters);
    }

    ManifestResource::new(
        "AWS::SecretsManager::Secret",
        json!({
            "Name": r.secret_name,
            "Description": r.description,
            "GenerateSecretString": generate,
        }),
    )
    .with_deletion_policy("Delete")
}

fn db_subnet_group(r: &DbSubnetGroup) -> ManifestResource {
    ManifestResource::new(
        "AWS::RDS::DBSubnetGroup",
        json!({
            "DBSubnetGroupDescription": r.description,
            "SubnetIds": refs(&r.subnets),
        }),
    )
}

fn database(r: &DatabaseInstance) -> ManifestResource {
    let Credentials::FromSecret { username, password } = &r.credentials;
    let security_groups: Vec<Value> = r.security_groups.iter().map(group_id).collect();

    ManifestResource::new(
        "AWS::RDS::DBInstance",
        json!({
            "DBName": r.database_name,
            "Engine": r.engine.kind.as_str(),
            "EngineVersion": r.engine.version,
            "DBInstanceClass": r.instance_type.as_database_class(),
            "AllocatedStorage": r.allocated_storage_gb.to_string(),
            "StorageType": "gp2",
            "DBSubnetGroupName": reference(&r.subnet_group),
            "VPCSecurityGroups": security_groups,
            "PubliclyAccessible": r.publicly_accessible,
            "MasterUsername": secret_field(username),
            "MasterUserPassword": secret_field(password),
            "BackupRetentionPeriod": r.backup.retention_days,
            "DeleteAutomatedBackups": r.backup.delete_automated_backups,
            "CopyTagsToSnapshot": true,
        }),
    )
    .with_deletion_policy(r.removal_policy.as_engine_policy())
}

fn render_output(output: &OutputDeclaration) -> Value {
    let mut rendered = json!({
        "Description": output.description,
        "Value": reference(&output.value),
    });
    if let Some(export) = &output.export_name {
        rendered["Export"] = json!({ "Name": export });
    }
    rendered
}
