// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarative cloud topology for the Composable Information Machine
//!
//! Declares a reference web topology (address space, subnets, NAT egress,
//! role-scoped firewall rule sets, standalone and pooled compute, a load
//! balancer, a managed database with a generated credential secret), checks
//! it against its invariants, orders it into a dependency graph and renders
//! it as a desired-state manifest for an external reconciliation engine.
//!
//! ```rust
//! use cim_topology::{Manifest, StackConfig, TopologyDescriptor};
//!
//! let topology = TopologyDescriptor::build(&StackConfig::default()).unwrap();
//! let manifest = Manifest::render(&topology).unwrap();
//! assert!(manifest.resource("Database").is_some());
//! ```

pub mod config;
pub mod descriptor;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod handoff;
pub mod manifest;
pub mod subjects;

// Re-export commonly used types
pub use config::StackConfig;
pub use descriptor::{Topology, TopologyDescriptor};
pub use errors::{TopologyError, TopologyResult};
pub use graph::{DependencyGraph, GraphError};
pub use handoff::{FilePublisher, ManifestPublisher, NatsConfig, NatsPublisher};
pub use manifest::Manifest;
