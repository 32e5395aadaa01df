// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Topology Layouts
//!
//! Any zone count and NAT count the configuration accepts must produce a
//! topology that validates, orders cleanly and renders without secret
//! material.

use cim_topology::domain::{RouteTarget, SubnetType};
use cim_topology::{DependencyGraph, Manifest, StackConfig, TopologyDescriptor};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

/// (zones, nat gateways) with 1 <= nats <= zones
fn zone_layout() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=6).prop_flat_map(|zones| (Just(zones), 1usize..=zones))
}

fn config_for(zones: usize, nats: usize) -> StackConfig {
    StackConfig {
        max_azs: zones,
        nat_gateways: nats,
        ..StackConfig::default()
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every accepted layout validates and keeps its subnets apart
    #[test]
    fn prop_layout_validates((zones, nats) in zone_layout()) {
        let config = config_for(zones, nats);
        let topology = TopologyDescriptor::build(&config).unwrap();
        prop_assert!(topology.validate().is_ok());

        let subnets = topology.subnets();
        prop_assert_eq!(subnets.len(), zones * 2);
        for (i, a) in subnets.iter().enumerate() {
            prop_assert!(config.cidr.contains(&a.cidr));
            prop_assert_eq!(a.map_public_ip_on_launch, a.subnet_type == SubnetType::Public);
            for b in &subnets[i + 1..] {
                prop_assert!(!a.cidr.overlaps(&b.cidr));
            }
        }
    }

    /// Public subnets route to the gateway, private ones to a NAT in a public subnet
    #[test]
    fn prop_routes_match_subnet_role((zones, nats) in zone_layout()) {
        let topology = TopologyDescriptor::build(&config_for(zones, nats)).unwrap();

        let public: HashSet<_> = topology
            .public_subnets()
            .iter()
            .map(|s| s.logical_id.clone())
            .collect();
        let nat_ids: HashSet<_> = topology
            .nat_gateways()
            .iter()
            .map(|n| n.logical_id.clone())
            .collect();

        for nat in topology.nat_gateways() {
            prop_assert!(public.contains(nat.subnet.target()));
        }

        let mut nats_in_use = HashSet::new();
        for table in topology.route_tables() {
            match &table.default_route {
                RouteTarget::InternetGateway(_) => {
                    prop_assert!(public.contains(table.subnet.target()));
                }
                RouteTarget::NatGateway(nat) => {
                    prop_assert!(!public.contains(table.subnet.target()));
                    prop_assert!(nat_ids.contains(nat.target()));
                    nats_in_use.insert(nat.target().clone());
                }
            }
        }
        prop_assert_eq!(nats_in_use.len(), nats);
    }

    /// The apply order places every dependency before its dependents
    #[test]
    fn prop_apply_order_respects_dependencies((zones, nats) in zone_layout()) {
        let topology = TopologyDescriptor::build(&config_for(zones, nats)).unwrap();
        let order = DependencyGraph::from_topology(&topology)
            .unwrap()
            .apply_order()
            .unwrap();
        prop_assert_eq!(order.len(), topology.resources().len());

        let mut applied = HashSet::new();
        for id in &order {
            let resource = topology.get(id).unwrap();
            for dependency in resource.dependencies() {
                prop_assert!(applied.contains(dependency), "{} must precede {}", dependency, id);
            }
            applied.insert(id.clone());
        }
    }

    /// The rendered manifest never carries the password, only a reference to it
    #[test]
    fn prop_manifest_keeps_password_in_secret_store((zones, nats) in zone_layout()) {
        let topology = TopologyDescriptor::build(&config_for(zones, nats)).unwrap();
        let manifest = Manifest::render(&topology).unwrap();

        let database = manifest.resource("Database").unwrap();
        prop_assert!(!database.properties["MasterUserPassword"].is_string());
        prop_assert!(database.properties["MasterUserPassword"].get("Fn::Join").is_some());

        let json = manifest.to_json_pretty().unwrap();
        prop_assert!(json.contains("GenerateStringKey"));
        prop_assert!(manifest.resources.len() > topology.resources().len());
    }
}
