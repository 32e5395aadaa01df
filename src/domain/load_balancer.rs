// Copyright (c) 2025 - Cowboy AI, Inc.
//! Traffic Distribution Block
//!
//! One internet-facing load balancer, one listener, one health-checked
//! target group that the elastic pool registers into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::{LogicalId, Reference};

/// Application-layer protocol spoken by listeners and targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationProtocol {
    Http,
    Https,
}

impl ApplicationProtocol {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for ApplicationProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "HTTP"),
            Self::Https => write!(f, "HTTPS"),
        }
    }
}

/// How targets are registered into a target group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Instance,
    Ip,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Ip => "ip",
        }
    }
}

/// Serialize durations as whole seconds
pub(crate) mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Target health check policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    #[serde(with = "seconds")]
    pub interval: Duration,
    #[serde(with = "seconds")]
    pub timeout: Duration,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Internet-facing application load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub logical_id: LogicalId,
    pub internet_facing: bool,
    pub subnets: Vec<Reference>,
    pub security_group: Reference,
}

/// Listener forwarding every request on its port to one target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub logical_id: LogicalId,
    pub load_balancer: Reference,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub default_target_group: Reference,
}

/// Health-checked set of targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub logical_id: LogicalId,
    pub name: String,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub target_type: TargetType,
    pub vpc: Reference,
    pub health_check: HealthCheck,
    /// Drain window before a target is fully deregistered
    #[serde(with = "seconds")]
    pub deregistration_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_health_check() {
        let hc = HealthCheck::default();
        assert_eq!(hc.path, "/");
        assert_eq!(hc.interval, Duration::from_secs(15));
        assert_eq!(hc.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let hc = HealthCheck::default();
        let json = serde_json::to_value(&hc).unwrap();
        assert_eq!(json["interval"], 15);
        assert_eq!(json["timeout"], 5);

        let back: HealthCheck = serde_json::from_value(json).unwrap();
        assert_eq!(back, hc);
    }

    #[test]
    fn test_protocol_ports() {
        assert_eq!(ApplicationProtocol::Http.default_port(), 80);
        assert_eq!(ApplicationProtocol::Https.to_string(), "HTTPS");
        assert_eq!(TargetType::Instance.as_str(), "instance");
    }
}
