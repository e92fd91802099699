// src/graph/builder.rs

//! Incremental construction of a [`TaskGraph`].
//!
//! The builder rejects bad edges at insert time instead of deferring to
//! submission: a duplicate local id, an edge to an unknown node, or an edge
//! that would close a cycle each fail the individual call and leave the
//! builder unchanged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::errors::{RelayError, Result};
use crate::graph::graph::{TaskGraph, TaskNode};
use crate::graph::task::{LocalId, TaskSpec, TaskStatus};

#[derive(Debug, Default)]
pub struct GraphBuilder {
    specs: BTreeMap<LocalId, TaskSpec>,
    /// `deps[a]` is the set of local ids that `a` depends on.
    deps: BTreeMap<LocalId, BTreeSet<LocalId>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task spec. Fails with [`RelayError::DuplicateId`] if the
    /// local id is already present.
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<()> {
        if self.specs.contains_key(&spec.local_id) {
            return Err(RelayError::DuplicateId(spec.local_id.clone()));
        }

        debug!(task = %spec.local_id, service = %spec.service, "adding task to graph");
        self.deps.insert(spec.local_id.clone(), BTreeSet::new());
        self.specs.insert(spec.local_id.clone(), spec);
        Ok(())
    }

    /// Declare that `from` depends on `to`: `to` must reach `finished`
    /// before `from` may be submitted.
    ///
    /// Fails with [`RelayError::UnknownNode`] if either id is absent, and
    /// with [`RelayError::Cycle`] if the edge would close a cycle. A failed
    /// call leaves the graph unchanged. Re-adding an existing edge is a no-op.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.specs.contains_key(from) {
            return Err(RelayError::UnknownNode(from.to_string()));
        }
        if !self.specs.contains_key(to) {
            return Err(RelayError::UnknownNode(to.to_string()));
        }
        if from == to {
            return Err(RelayError::Cycle(format!(
                "task '{from}' cannot depend on itself"
            )));
        }
        // The edge closes a cycle iff `to` already transitively depends on
        // `from`.
        if self.depends_transitively(to, from) {
            return Err(RelayError::Cycle(format!(
                "adding dependency '{from}' -> '{to}' would close a cycle"
            )));
        }

        if let Some(edges) = self.deps.get_mut(from) {
            edges.insert(to.to_string());
        }
        Ok(())
    }

    /// Whether `start` transitively depends on `needle`.
    fn depends_transitively(&self, start: &str, needle: &str) -> bool {
        let mut stack: Vec<&str> = vec![start];
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(deps) = self.deps.get(id) {
                for dep in deps {
                    if dep == needle {
                        return true;
                    }
                    stack.push(dep);
                }
            }
        }

        false
    }

    /// Finalize into an immutable [`TaskGraph`].
    ///
    /// Fails with [`RelayError::EmptyGraph`] if no tasks were added. The
    /// returned graph carries a valid topological order over its nodes;
    /// acyclicity is guaranteed by the insert-time checks.
    pub fn build(self) -> Result<TaskGraph> {
        if self.specs.is_empty() {
            return Err(RelayError::EmptyGraph);
        }

        let mut nodes: BTreeMap<LocalId, TaskNode> = BTreeMap::new();
        for (id, spec) in self.specs {
            let deps = self.deps.get(&id).cloned().unwrap_or_default();
            nodes.insert(
                id,
                TaskNode {
                    spec,
                    deps: deps.into_iter().collect(),
                    dependents: Vec::new(),
                    status: TaskStatus::Pending,
                },
            );
        }

        // Reverse adjacency.
        let ids: Vec<LocalId> = nodes.keys().cloned().collect();
        for id in &ids {
            let deps = nodes[id].deps.clone();
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(id.clone());
                }
            }
        }

        let topo = kahn_order(&nodes);
        debug_assert_eq!(topo.len(), nodes.len());

        Ok(TaskGraph::new(nodes, topo))
    }
}

/// Kahn's algorithm over the node map. Iteration order of the underlying
/// `BTreeMap` keeps the result deterministic across runs.
fn kahn_order(nodes: &BTreeMap<LocalId, TaskNode>) -> Vec<LocalId> {
    let mut in_degree: BTreeMap<&LocalId, usize> = nodes
        .iter()
        .map(|(id, node)| (id, node.deps.len()))
        .collect();

    let mut queue: VecDeque<&LocalId> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.clone());
        for dependent in &nodes[id].dependents {
            if let Some(deg) = in_degree.get_mut(dependent) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    order
}
