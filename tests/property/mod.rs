// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Subnet allocation over arbitrary address spaces, and whole-topology
//! invariants over arbitrary zone layouts.

mod subnet_allocation;
mod topology_layout;
