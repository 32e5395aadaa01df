// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack configuration
//!
//! Every tunable of the reference topology lives in [`StackConfig`]. The
//! defaults reproduce the reference stack; [`StackConfig::from_env`] lets an
//! operator override them per build with `TOPOLOGY_*` variables, and
//! `TOPOLOGY_CONFIG` can point at a JSON file used as the base instead of
//! the defaults.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::env::VarError;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::load_balancer::seconds;
use crate::domain::{
    AvailabilityZone, BackupPolicy, DatabaseEngine, EgressPolicy, HealthCheck, InstanceType,
    Ipv4Cidr, MachineImage, NetworkError, Peer, PoolCapacity, RemovalPolicy,
};
use crate::errors::{TopologyError, TopologyResult};

/// Parameters of one topology build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Name of the stack handed to the engine
    pub stack_name: String,
    pub stack_version: u32,
    /// Prepended to every physical resource name
    pub name_prefix: String,
    pub region: String,

    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub nat_gateways: usize,
    pub public_subnet_mask: u8,
    pub private_subnet_mask: u8,

    pub instance_type: InstanceType,
    /// Image of the standalone instances
    pub image: MachineImage,
    pub key_name: String,
    /// Image launched by the elastic pool
    pub pool_image: MachineImage,
    pub pool_capacity: PoolCapacity,

    pub ssh_source: Peer,
    pub http_source: Peer,
    pub db_source: Peer,
    /// Outbound policy of the database rule set
    pub database_egress: EgressPolicy,

    pub http_port: u16,
    pub health_check: HealthCheck,
    #[serde(with = "seconds")]
    pub deregistration_delay: Duration,

    pub database_name: String,
    pub database_engine: DatabaseEngine,
    pub database_instance_type: InstanceType,
    pub allocated_storage_gb: u32,
    pub backup: BackupPolicy,
    pub removal_policy: RemovalPolicy,

    pub secret_name: String,
    pub secret_username: String,
    pub password_length: u16,

    /// Export the load balancer DNS name as a stack output
    pub export_outputs: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: "CdkprojectStack".to_string(),
            stack_version: 1,
            name_prefix: String::new(),
            region: "us-east-1".to_string(),
            cidr: Ipv4Cidr::new(std::net::Ipv4Addr::new(10, 20, 0, 0), 16)
                .unwrap_or(Ipv4Cidr::ANY),
            max_azs: 2,
            nat_gateways: 1,
            public_subnet_mask: 24,
            private_subnet_mask: 24,
            instance_type: InstanceType::default(),
            image: MachineImage::amazon_linux_2(),
            key_name: "kpcdkmajid".to_string(),
            pool_image: MachineImage::amazon_linux(),
            pool_capacity: PoolCapacity::default(),
            ssh_source: Peer::AnyIpv4,
            http_source: Peer::AnyIpv4,
            db_source: Peer::AnyIpv4,
            database_egress: EgressPolicy::AllowAll,
            http_port: 80,
            health_check: HealthCheck::default(),
            deregistration_delay: Duration::from_secs(45),
            database_name: "cdkproject".to_string(),
            database_engine: DatabaseEngine::mysql("8.0.34"),
            database_instance_type: InstanceType::default(),
            allocated_storage_gb: 100,
            backup: BackupPolicy::disabled(),
            removal_policy: RemovalPolicy::Destroy,
            secret_name: "db-master-user-secret".to_string(),
            secret_username: "admin".to_string(),
            password_length: 16,
            export_outputs: false,
        }
    }
}

impl StackConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> TopologyResult<Self> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(TopologyError::Configuration(format!(
                "{} is not valid unicode",
                key
            ))),
        })
    }

    /// Build from a fallible variable lookup: the `TOPOLOGY_CONFIG` file (or
    /// the defaults) overlaid with every `TOPOLOGY_*` override
    pub fn from_lookup<F>(lookup: F) -> TopologyResult<Self>
    where
        F: Fn(&str) -> TopologyResult<Option<String>>,
    {
        let base = match lookup("TOPOLOGY_CONFIG")? {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        // surface the first unreadable override instead of skipping it
        let unreadable = RefCell::new(None);
        let config = base.with_overrides(|key| match lookup(key) {
            Ok(value) => value,
            Err(e) => {
                unreadable.borrow_mut().get_or_insert(e);
                None
            }
        });
        match unreadable.into_inner() {
            Some(e) => Err(e),
            None => config,
        }
    }

    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> TopologyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TopologyError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            TopologyError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Apply `TOPOLOGY_*` overrides looked up through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> TopologyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TOPOLOGY_STACK_NAME") {
            self.stack_name = v;
        }
        if let Some(v) = lookup("TOPOLOGY_NAME_PREFIX") {
            self.name_prefix = v;
        }
        if let Some(v) = lookup("TOPOLOGY_REGION") {
            self.region = v;
        }
        if let Some(v) = lookup("TOPOLOGY_KEY_NAME") {
            self.key_name = v;
        }

        parse_into(&lookup, "TOPOLOGY_STACK_VERSION", &mut self.stack_version)?;
        parse_into(&lookup, "TOPOLOGY_CIDR", &mut self.cidr)?;
        parse_into(&lookup, "TOPOLOGY_MAX_AZS", &mut self.max_azs)?;
        parse_into(&lookup, "TOPOLOGY_NAT_GATEWAYS", &mut self.nat_gateways)?;
        parse_into(&lookup, "TOPOLOGY_INSTANCE_TYPE", &mut self.instance_type)?;
        parse_into(&lookup, "TOPOLOGY_EXPORT_OUTPUTS", &mut self.export_outputs)?;
        parse_into(&lookup, "TOPOLOGY_DATABASE_EGRESS", &mut self.database_egress)?;

        for (key, peer) in [
            ("TOPOLOGY_SSH_SOURCE", &mut self.ssh_source),
            ("TOPOLOGY_HTTP_SOURCE", &mut self.http_source),
            ("TOPOLOGY_DB_SOURCE", &mut self.db_source),
        ] {
            if let Some(v) = lookup(key) {
                *peer = Peer::parse(&v)
                    .map_err(|e| TopologyError::Configuration(format!("{}: {}", key, e)))?;
            }
        }

        Ok(self)
    }

    /// The availability zones the topology spreads across
    pub fn zones(&self) -> Result<Vec<AvailabilityZone>, NetworkError> {
        AvailabilityZone::for_region(&self.region, self.max_azs)
    }

    /// Physical name with the build's prefix applied
    pub fn physical_name(&self, name: &str) -> String {
        if self.name_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}-{}", self.name_prefix, name)
        }
    }
}

fn parse_into<T, F>(lookup: &F, key: &str, slot: &mut T) -> TopologyResult<()>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| TopologyError::Configuration(format!("{}={:?}: {}", key, raw, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_reference_defaults() {
        let config = StackConfig::default();
        assert_eq!(config.cidr.to_string(), "10.20.0.0/16");
        assert_eq!(config.max_azs, 2);
        assert_eq!(config.nat_gateways, 1);
        assert_eq!(config.key_name, "kpcdkmajid");
        assert_eq!(config.database_name, "cdkproject");
        assert_eq!(config.database_engine.version, "8.0.34");
        assert_eq!(config.deregistration_delay, Duration::from_secs(45));
        assert!(!config.export_outputs);
        assert_eq!(config.image, MachineImage::amazon_linux_2());
        assert_eq!(config.pool_image, MachineImage::amazon_linux());
    }

    #[test]
    fn test_overrides() {
        let config = StackConfig::default()
            .with_overrides(lookup(&[
                ("TOPOLOGY_MAX_AZS", "3"),
                ("TOPOLOGY_CIDR", "10.50.0.0/16"),
                ("TOPOLOGY_SSH_SOURCE", "203.0.113.0/24"),
                ("TOPOLOGY_EXPORT_OUTPUTS", "true"),
                ("TOPOLOGY_NAME_PREFIX", "staging"),
                ("TOPOLOGY_DATABASE_EGRESS", "deny_all"),
            ]))
            .unwrap();

        assert_eq!(config.max_azs, 3);
        assert_eq!(config.cidr.to_string(), "10.50.0.0/16");
        assert!(!config.ssh_source.is_unrestricted());
        assert!(config.db_source.is_unrestricted());
        assert!(config.export_outputs);
        assert_eq!(config.physical_name("public-EC2"), "staging-public-EC2");
        assert_eq!(config.database_egress, EgressPolicy::DenyAll);
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let err = StackConfig::default()
            .with_overrides(lookup(&[("TOPOLOGY_MAX_AZS", "two")]))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(msg) if msg.contains("TOPOLOGY_MAX_AZS")));

        let err = StackConfig::default()
            .with_overrides(lookup(&[("TOPOLOGY_DB_SOURCE", "10.0.0.1/8")]))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(_)));
    }

    #[test]
    fn test_zones() {
        let zones = StackConfig::default().zones().unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1].as_str(), "us-east-1b");
    }

    #[test]
    fn test_from_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"stack_name": "Demo", "max_azs": 3}}"#).unwrap();

        let config = StackConfig::from_file(file.path()).unwrap();
        assert_eq!(config.stack_name, "Demo");
        assert_eq!(config.max_azs, 3);
        assert_eq!(config.nat_gateways, 1);
        assert_eq!(config.key_name, "kpcdkmajid");
    }

    #[test]
    fn test_from_file_rejects_inverted_pool_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pool_capacity": {{"min": 3, "max": 1, "desired": 9}}}}"#).unwrap();

        let err = StackConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(msg) if msg.contains("Invalid pool capacity")));
    }

    #[test]
    fn test_unreadable_variable_is_reported() {
        let lookup = |key: &str| match key {
            "TOPOLOGY_CONFIG" => Err(TopologyError::Configuration(
                "TOPOLOGY_CONFIG is not valid unicode".to_string(),
            )),
            _ => Ok(None),
        };
        let err = StackConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(msg) if msg.contains("TOPOLOGY_CONFIG")));

        let lookup = |key: &str| match key {
            "TOPOLOGY_REGION" => Err(TopologyError::Configuration(
                "TOPOLOGY_REGION is not valid unicode".to_string(),
            )),
            _ => Ok(None),
        };
        let err = StackConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(msg) if msg.contains("TOPOLOGY_REGION")));
    }

    #[test]
    fn test_lookup_without_variables_gives_defaults() {
        let config = StackConfig::from_lookup(|_| Ok(None)).unwrap();
        assert_eq!(config, StackConfig::default());
    }
}
