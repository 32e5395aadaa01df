// Copyright (c) 2025 - Cowboy AI, Inc.
//! Manifest rendering tests
//!
//! The rendered document is what leaves the process, so these tests look
//! at the JSON itself rather than at the typed topology.

mod fixtures;

use cim_topology::{Manifest, StackConfig};
use fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn walk_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| walk_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| walk_strings(v, out)),
        _ => {}
    }
}

#[test]
fn test_no_plaintext_password() {
    let manifest = reference_manifest();
    let value = manifest.to_value().unwrap();

    let mut strings = Vec::new();
    walk_strings(&value, &mut strings);

    // the only secret material is the username template; the password is
    // produced by the secret store and only ever referenced
    let secret = &value["Resources"]["DatabaseMasterUserSecret"]["Properties"];
    assert_eq!(
        secret["GenerateSecretString"],
        json!({
            "SecretStringTemplate": "{\"username\":\"admin\"}",
            "GenerateStringKey": "password",
            "PasswordLength": 16,
            "ExcludePunctuation": true,
            "IncludeSpace": false,
        })
    );

    let db = &value["Resources"]["Database"]["Properties"];
    assert!(db["MasterUserPassword"].get("Fn::Join").is_some());
    assert!(!db["MasterUserPassword"].is_string());
    assert!(strings
        .iter()
        .filter(|s| s.contains("SecretString:password"))
        .all(|s| s.starts_with(':')));
}

#[test]
fn test_security_groups_render_single_ingress_rule() {
    let manifest = reference_manifest();
    let expected = [
        ("HostSecurityGroup", "allow-ssh-sg", 22),
        ("LoadBalancerSecurityGroup", "allow-http", 80),
        ("DatabaseSecurityGroup", "allow-SQL", 3306),
    ];

    for (id, name, port) in expected {
        let group = manifest.resource(id).unwrap();
        assert_eq!(group.properties["GroupName"], name);
        assert_eq!(
            group.properties["SecurityGroupIngress"],
            json!([{
                "CidrIp": "0.0.0.0/0",
                "IpProtocol": "tcp",
                "FromPort": port,
                "ToPort": port,
                "Description": group.properties["SecurityGroupIngress"][0]["Description"],
            }])
        );
        assert_eq!(group.properties["SecurityGroupEgress"][0]["IpProtocol"], "-1");
    }
}

#[test]
fn test_public_instance_gets_public_interface() {
    let manifest = reference_manifest();

    let public = manifest.resource("PublicInstance").unwrap();
    assert_eq!(
        public.properties["NetworkInterfaces"][0]["AssociatePublicIpAddress"],
        true
    );
    assert_eq!(public.properties["KeyName"], json!({ "Ref": "KeyPair" }));

    let private = manifest.resource("PrivateInstance").unwrap();
    assert!(private.properties.get("NetworkInterfaces").is_none());
    assert_eq!(
        private.properties["SubnetId"],
        json!({ "Ref": "VpcPrivateSubnet1" })
    );
}

#[test]
fn test_load_balancer_and_listener() {
    let manifest = reference_manifest();

    let lb = manifest.resource("LoadBalancer").unwrap();
    assert_eq!(lb.properties["Scheme"], "internet-facing");
    assert_eq!(
        lb.properties["Subnets"],
        json!([{ "Ref": "VpcPublicSubnet1" }, { "Ref": "VpcPublicSubnet2" }])
    );

    let listener = manifest.resource("WebListener").unwrap();
    assert_eq!(
        listener.properties,
        json!({
            "LoadBalancerArn": { "Ref": "LoadBalancer" },
            "Port": 80,
            "Protocol": "HTTP",
            "DefaultActions": [{
                "Type": "forward",
                "TargetGroupArn": { "Ref": "WebTargetGroup" },
            }],
        })
    );
    assert_eq!(listener.depends_on, vec!["LoadBalancer", "WebTargetGroup"]);
}

#[test]
fn test_pool_renders_launch_template() {
    let manifest = reference_manifest();
    let pool = manifest.resource("WebPool").unwrap();

    assert_eq!(pool.resource_type, "AWS::AutoScaling::AutoScalingGroup");
    assert_eq!(pool.properties["MinSize"], "1");
    assert_eq!(
        pool.properties["VPCZoneIdentifier"],
        json!([{ "Ref": "VpcPrivateSubnet1" }, { "Ref": "VpcPrivateSubnet2" }])
    );

    let template = manifest.resource("WebPoolLaunchTemplate").unwrap();
    assert_eq!(
        template.properties["LaunchTemplateData"]["InstanceType"],
        "t2.micro"
    );
}

#[test]
fn test_pool_and_instances_use_distinct_image_generations() {
    let manifest = reference_manifest();

    let template = manifest.resource("WebPoolLaunchTemplate").unwrap();
    assert_eq!(
        template.properties["LaunchTemplateData"]["ImageId"],
        "{{resolve:ssm:/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2}}"
    );

    for id in ["PublicInstance", "PrivateInstance"] {
        assert_eq!(
            manifest.resource(id).unwrap().properties["ImageId"],
            "{{resolve:ssm:/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2}}"
        );
    }
}

#[test]
fn test_outputs_only_when_requested() {
    assert!(reference_manifest().to_value().unwrap().get("Outputs").is_none());

    let config = StackConfig {
        export_outputs: true,
        ..StackConfig::default()
    };
    let manifest = Manifest::render(&build(&config)).unwrap();
    assert_eq!(
        manifest.outputs["LoadBalancerDnsName"]["Value"],
        json!({ "Fn::GetAtt": ["LoadBalancer", "DNSName"] })
    );
}

#[test]
fn test_hardened_manifest_has_no_warnings() {
    let manifest = Manifest::render(&build(&hardened_config())).unwrap();
    assert!(manifest.metadata.warnings.is_empty());

    let db = manifest.resource("Database").unwrap();
    assert_eq!(db.deletion_policy.as_deref(), Some("Snapshot"));
    assert_eq!(db.properties["BackupRetentionPeriod"], 7);

    let value = manifest.to_value().unwrap();
    assert!(value["Metadata"].get("Warnings").is_none());
}

#[test]
fn test_denied_egress_renders_unmatchable_rule() {
    let manifest = Manifest::render(&build(&hardened_config())).unwrap();

    let database = manifest.resource("DatabaseSecurityGroup").unwrap();
    assert_eq!(
        database.properties["SecurityGroupEgress"],
        json!([{
            "CidrIp": "255.255.255.255/32",
            "IpProtocol": "icmp",
            "FromPort": 252,
            "ToPort": 86,
            "Description": "Disallow all traffic",
        }])
    );

    // only the database rule set is locked down
    let host = manifest.resource("HostSecurityGroup").unwrap();
    assert_eq!(host.properties["SecurityGroupEgress"][0]["IpProtocol"], "-1");
}

#[test]
fn test_json_round_trip_preserves_manifest() {
    let manifest = reference_manifest();
    let json = manifest.to_json_pretty().unwrap();
    let parsed: Manifest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, manifest);
}
