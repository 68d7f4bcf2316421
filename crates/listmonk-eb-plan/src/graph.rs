//! Dependency graph over a plan's resources
//!
//! Edges run from a dependency to the resource that needs it. The external
//! engine creates resources wave by wave: everything in a wave only depends
//! on resources in earlier waves, so a wave may be created in parallel.

use crate::error::{PlanError, Result};
use crate::plan::Plan;
use listmonk_eb_types::LogicalId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::HashMap;

/// Resolved creation order of a plan
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<LogicalId, ()>,
    nodes: HashMap<LogicalId, NodeIndex>,
    waves: Vec<Vec<NodeIndex>>,
}

impl DependencyGraph {
    /// Build the graph, failing on a cycle or an edge to an unknown resource.
    pub fn build(plan: &Plan) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(plan.len(), plan.len() * 2);
        let mut nodes = HashMap::with_capacity(plan.len());

        // Node indices follow declaration order.
        for resource in plan.resources() {
            let node = graph.add_node(resource.id.clone());
            nodes.insert(resource.id.clone(), node);
        }
        for resource in plan.resources() {
            let to = nodes[&resource.id];
            for dep in resource.dependencies() {
                let from = *nodes.get(dep).ok_or_else(|| PlanError::DanglingDependency {
                    resource: resource.id.clone(),
                    missing: dep.clone(),
                })?;
                graph.add_edge(from, to, ());
            }
        }

        let sorted = toposort(&graph, None)
            .map_err(|cycle| PlanError::Cycle(graph[cycle.node_id()].clone()))?;

        let mut level = vec![0usize; graph.node_count()];
        for &node in &sorted {
            let depth = graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|dep| level[dep.index()] + 1)
                .max()
                .unwrap_or(0);
            level[node.index()] = depth;
        }

        let wave_count = level.iter().max().map_or(0, |m| m + 1);
        let mut waves = vec![Vec::new(); wave_count];
        for node in graph.node_indices() {
            waves[level[node.index()]].push(node);
        }

        Ok(Self { graph, nodes, waves })
    }

    /// Creation waves, each in declaration order
    pub fn waves(&self) -> Vec<Vec<&LogicalId>> {
        self.waves
            .iter()
            .map(|wave| wave.iter().map(|&n| &self.graph[n]).collect())
            .collect()
    }

    /// A complete creation order: waves flattened
    pub fn creation_order(&self) -> Vec<&LogicalId> {
        self.waves
            .iter()
            .flatten()
            .map(|&n| &self.graph[n])
            .collect()
    }

    /// Wave index a resource is created in
    pub fn wave_of(&self, id: &LogicalId) -> Option<usize> {
        let node = self.nodes.get(id)?;
        self.waves.iter().position(|wave| wave.contains(node))
    }

    /// Resources that depend on `id` directly
    pub fn dependents(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Resources `id` depends on directly
    pub fn dependencies(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Every resource reachable from `id` along dependency edges, excluding `id`
    pub fn transitive_dependents(&self, id: &LogicalId) -> Vec<&LogicalId> {
        let Some(&start) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                out.push(node);
            }
        }
        out.sort();
        out.into_iter().map(|n| &self.graph[n]).collect()
    }

    fn neighbors(&self, id: &LogicalId, direction: Direction) -> Vec<&LogicalId> {
        let Some(&node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        found.sort();
        found.dedup();
        found.into_iter().map(|n| &self.graph[n]).collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
