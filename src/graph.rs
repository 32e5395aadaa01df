// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource dependency graph
//!
//! Creation order is never implied by declaration order. Every [`Reference`]
//! a resource holds becomes an explicit edge, and the apply order is a
//! topological sort of those edges. Ties are broken by logical id so the
//! same topology always yields the same order.
//!
//! [`Reference`]: crate::domain::Reference

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

use crate::descriptor::Topology;
use crate::domain::LogicalId;

/// Dependency graph error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("{from} references unknown resource {to}")]
    UnknownReference { from: LogicalId, to: LogicalId },

    #[error("Dependency cycle among: {}", format_ids(.0))]
    CycleDetected(Vec<LogicalId>),
}

fn format_ids(ids: &[LogicalId]) -> String {
    ids.iter()
        .map(LogicalId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Directed graph: each node maps to the nodes it depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    dependencies: BTreeMap<LogicalId, BTreeSet<LogicalId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every reference held by the topology's resources
    pub fn from_topology(topology: &Topology) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for resource in topology.resources() {
            graph.add_node(resource.logical_id().clone());
        }

        for resource in topology.resources() {
            for dependency in resource.dependencies() {
                if !graph.contains(dependency) {
                    return Err(GraphError::UnknownReference {
                        from: resource.logical_id().clone(),
                        to: dependency.clone(),
                    });
                }
                graph.add_dependency(resource.logical_id().clone(), dependency.clone());
            }
        }

        Ok(graph)
    }

    pub fn add_node(&mut self, id: LogicalId) {
        self.dependencies.entry(id).or_default();
    }

    /// Record that `dependent` must be created after `dependency`
    pub fn add_dependency(&mut self, dependent: LogicalId, dependency: LogicalId) {
        self.add_node(dependency.clone());
        self.dependencies.entry(dependent).or_default().insert(dependency);
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.dependencies.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Direct dependencies of `id`, sorted
    pub fn dependencies_of(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.dependencies
            .get(id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Resources that directly depend on `id`, sorted
    pub fn dependents_of(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.dependencies
            .iter()
            .filter(|(_, deps)| deps.contains(id))
            .map(|(node, _)| node)
            .collect()
    }

    /// Creation order: every dependency before its dependents
    ///
    /// Kahn's algorithm over in-degrees; whenever several nodes are ready
    /// the smallest logical id goes first.
    pub fn apply_order(&self) -> Result<Vec<LogicalId>, GraphError> {
        let mut in_degree: BTreeMap<&LogicalId, usize> = self
            .dependencies
            .iter()
            .map(|(node, deps)| (node, deps.len()))
            .collect();

        let mut dependents: BTreeMap<&LogicalId, Vec<&LogicalId>> = BTreeMap::new();
        for (node, deps) in &self.dependencies {
            for dep in deps {
                dependents.entry(dep).or_default().push(node);
            }
        }

        let mut ready: BTreeSet<&LogicalId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&node, _)| node)
            .collect();

        let mut order = Vec::with_capacity(self.dependencies.len());
        while let Some(node) = ready.pop_first() {
            order.push(node.clone());

            for &dependent in dependents.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.dependencies.len() {
            let remaining = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(node, _)| node.clone())
                .collect();
            return Err(GraphError::CycleDetected(remaining));
        }

        Ok(order)
    }

    /// Deletion order: dependents before their dependencies
    pub fn destroy_order(&self) -> Result<Vec<LogicalId>, GraphError> {
        let mut order = self.apply_order()?;
        order.reverse();
        Ok(order)
    }

    /// Every resource `id` transitively depends on, breadth first
    pub fn transitive_dependencies(&self, id: &LogicalId) -> BTreeSet<LogicalId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&LogicalId> = self.dependencies_of(id).into_iter().collect();

        while let Some(next) = queue.pop_front() {
            if seen.insert(next.clone()) {
                queue.extend(self.dependencies_of(next));
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    fn chain() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(id("Subnet"), id("Vpc"));
        graph.add_dependency(id("Nat"), id("Subnet"));
        graph.add_dependency(id("Nat"), id("Eip"));
        graph.add_dependency(id("Eip"), id("Igw"));
        graph.add_dependency(id("Igw"), id("Vpc"));
        graph
    }

    fn position(order: &[LogicalId], s: &str) -> usize {
        order.iter().position(|x| x.as_str() == s).unwrap()
    }

    #[test]
    fn test_apply_order_respects_edges() {
        let order = chain().apply_order().unwrap();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0].as_str(), "Vpc");
        assert!(position(&order, "Igw") < position(&order, "Eip"));
        assert!(position(&order, "Eip") < position(&order, "Nat"));
        assert!(position(&order, "Subnet") < position(&order, "Nat"));
    }

    #[test]
    fn test_ties_broken_by_logical_id() {
        let order = chain().apply_order().unwrap();
        let names: Vec<_> = order.iter().map(LogicalId::as_str).collect();
        assert_eq!(names, vec!["Vpc", "Igw", "Eip", "Subnet", "Nat"]);
    }

    #[test]
    fn test_destroy_order_is_reverse() {
        let graph = chain();
        let mut apply = graph.apply_order().unwrap();
        apply.reverse();
        assert_eq!(graph.destroy_order().unwrap(), apply);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = chain();
        graph.add_dependency(id("Vpc"), id("Nat"));

        match graph.apply_order() {
            Err(GraphError::CycleDetected(nodes)) => {
                assert!(nodes.contains(&id("Vpc")));
                assert!(nodes.contains(&id("Nat")));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_dependents_and_transitive() {
        let graph = chain();
        assert_eq!(graph.dependents_of(&id("Vpc")), vec![&id("Igw"), &id("Subnet")]);
        assert_eq!(graph.dependencies_of(&id("Nat")), vec![&id("Eip"), &id("Subnet")]);

        let all = graph.transitive_dependencies(&id("Nat"));
        assert_eq!(all.len(), 4);
        assert!(all.contains(&id("Vpc")));
    }
}
