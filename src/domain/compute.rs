// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Block
//!
//! Standalone instances, the elastic pool behind the load balancer, and the
//! key pair the standalone instances are reachable with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{LogicalId, Reference, SubnetType};

/// Compute value object error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("Invalid instance type: {0}")]
    InvalidInstanceType(String),

    #[error("Invalid pool capacity: min {min}, max {max}, desired {desired:?}")]
    InvalidCapacity {
        min: u32,
        max: u32,
        desired: Option<u32>,
    },
}

/// Instance family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceClass {
    T2,
    T3,
    T3a,
    M5,
    C5,
    R5,
}

impl InstanceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::T2 => "t2",
            Self::T3 => "t3",
            Self::T3a => "t3a",
            Self::M5 => "m5",
            Self::C5 => "c5",
            Self::R5 => "r5",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "t2" => Some(Self::T2),
            "t3" => Some(Self::T3),
            "t3a" => Some(Self::T3a),
            "m5" => Some(Self::M5),
            "c5" => Some(Self::C5),
            "r5" => Some(Self::R5),
            _ => None,
        }
    }
}

/// Instance size within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
    Xlarge,
}

impl InstanceSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nano => "nano",
            Self::Micro => "micro",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xlarge => "xlarge",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "nano" => Some(Self::Nano),
            "micro" => Some(Self::Micro),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "xlarge" => Some(Self::Xlarge),
            _ => None,
        }
    }
}

/// Size class, e.g. `t2.micro`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }

    /// Database engines name the same size class with a `db.` prefix
    pub fn as_database_class(&self) -> String {
        format!("db.{}", self)
    }
}

impl Default for InstanceType {
    fn default() -> Self {
        Self::of(InstanceClass::T2, InstanceSize::Micro)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class.as_str(), self.size.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, size) = s
            .split_once('.')
            .ok_or_else(|| ComputeError::InvalidInstanceType(s.to_string()))?;

        match (InstanceClass::parse(class), InstanceSize::parse(size)) {
            (Some(class), Some(size)) => Ok(Self { class, size }),
            _ => Err(ComputeError::InvalidInstanceType(s.to_string())),
        }
    }
}

impl TryFrom<String> for InstanceType {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstanceType> for String {
    fn from(t: InstanceType) -> Self {
        t.to_string()
    }
}

/// Amazon Linux generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmazonLinuxGeneration {
    AmazonLinux,
    AmazonLinux2,
    AmazonLinux2023,
}

/// Machine image reference, resolved by the engine at apply time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MachineImage {
    LatestAmazonLinux { generation: AmazonLinuxGeneration },
    Ami { image_id: String },
}

impl MachineImage {
    /// Latest first-generation Amazon Linux
    pub fn amazon_linux() -> Self {
        Self::LatestAmazonLinux {
            generation: AmazonLinuxGeneration::AmazonLinux,
        }
    }

    pub fn amazon_linux_2() -> Self {
        Self::LatestAmazonLinux {
            generation: AmazonLinuxGeneration::AmazonLinux2,
        }
    }

    /// Public parameter path holding the latest image id for the generation
    pub fn parameter_path(&self) -> Option<&'static str> {
        match self {
            Self::LatestAmazonLinux { generation } => Some(match generation {
                AmazonLinuxGeneration::AmazonLinux => {
                    "/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2"
                }
                AmazonLinuxGeneration::AmazonLinux2 => {
                    "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2"
                }
                AmazonLinuxGeneration::AmazonLinux2023 => {
                    "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64"
                }
            }),
            Self::Ami { .. } => None,
        }
    }
}

/// SSH key pair created with the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub logical_id: LogicalId,
    pub key_name: String,
}

/// Standalone instance pinned to one subnet
///
/// # Invariants
/// - A public instance has `associate_public_ip` set and sits in a public subnet
/// - A private instance has it unset and sits in a private subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub logical_id: LogicalId,
    pub name: String,
    pub instance_type: InstanceType,
    pub image: MachineImage,
    pub subnet: Reference,
    pub placement: SubnetType,
    pub security_group: Reference,
    pub key_pair: Option<Reference>,
    pub associate_public_ip: bool,
}

/// Min/max/desired size of an elastic pool
///
/// Deserialization goes through [`PoolCapacity::new`], so a decoded
/// capacity always satisfies `min <= desired <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPoolCapacity")]
pub struct PoolCapacity {
    pub min: u32,
    pub max: u32,
    pub desired: Option<u32>,
}

impl PoolCapacity {
    pub fn new(min: u32, max: u32, desired: Option<u32>) -> Result<Self, ComputeError> {
        let capacity = Self { min, max, desired };
        if !capacity.is_consistent() {
            return Err(ComputeError::InvalidCapacity { min, max, desired });
        }
        Ok(capacity)
    }

    /// `min <= max`, and `desired` (when set) lies between them
    pub fn is_consistent(&self) -> bool {
        self.min <= self.max
            && self
                .desired
                .map_or(true, |d| (self.min..=self.max).contains(&d))
    }
}

#[derive(Deserialize)]
struct RawPoolCapacity {
    min: u32,
    max: u32,
    #[serde(default)]
    desired: Option<u32>,
}

impl TryFrom<RawPoolCapacity> for PoolCapacity {
    type Error = ComputeError;

    fn try_from(raw: RawPoolCapacity) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max, raw.desired)
    }
}

impl Default for PoolCapacity {
    fn default() -> Self {
        Self {
            min: 1,
            max: 1,
            desired: None,
        }
    }
}

/// Elastic pool (auto-scaling group) in private subnets
///
/// Membership is owned by the engine; no scaling policy is declared here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticPool {
    pub logical_id: LogicalId,
    pub instance_type: InstanceType,
    pub image: MachineImage,
    pub subnets: Vec<Reference>,
    pub placement: SubnetType,
    pub capacity: PoolCapacity,
    pub target_groups: Vec<Reference>,
}
