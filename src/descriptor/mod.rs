// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Descriptor
//!
//! [`TopologyDescriptor::build`] turns a [`StackConfig`](crate::config::StackConfig)
//! into a validated [`Topology`]: an inert, named and versioned declaration
//! of every resource the reconciliation engine should converge on.

mod builder;
mod topology;

pub use builder::TopologyDescriptor;
pub use topology::{OutputDeclaration, Topology};
