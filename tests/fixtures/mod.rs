// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-topology
//!
//! Deterministic stack configurations and the topologies built from them.
//! Every fixture starts from the reference defaults and changes only what
//! the scenario needs.

#![allow(dead_code)]

use cim_topology::domain::{BackupPolicy, EgressPolicy, Ipv4Cidr, Peer, RemovalPolicy};
use cim_topology::{Manifest, StackConfig, Topology, TopologyDescriptor};

pub const OFFICE_CIDR: &str = "203.0.113.0/24";

/// The reference stack
pub fn reference_config() -> StackConfig {
    StackConfig::default()
}

/// Reference stack spread over `zones` availability zones
pub fn zoned_config(zones: usize) -> StackConfig {
    StackConfig {
        max_azs: zones,
        ..StackConfig::default()
    }
}

/// Narrowed sources, no database egress, retained backups, snapshot on removal
pub fn hardened_config() -> StackConfig {
    let office: Ipv4Cidr = OFFICE_CIDR.parse().expect("Invalid office CIDR");
    StackConfig {
        name_prefix: "prod".to_string(),
        ssh_source: Peer::Cidr(office),
        db_source: Peer::Cidr(office),
        database_egress: EgressPolicy::DenyAll,
        backup: BackupPolicy {
            retention_days: 7,
            delete_automated_backups: false,
        },
        removal_policy: RemovalPolicy::Snapshot,
        ..StackConfig::default()
    }
}

pub fn build(config: &StackConfig) -> Topology {
    TopologyDescriptor::build(config).expect("Fixture topology must build")
}

pub fn reference_topology() -> Topology {
    build(&reference_config())
}

pub fn reference_manifest() -> Manifest {
    Manifest::render(&reference_topology()).expect("Fixture manifest must render")
}
