// src/graph/graph.rs

//! Immutable task graph produced by [`GraphBuilder`](crate::graph::GraphBuilder).

use std::collections::BTreeMap;

use crate::graph::task::{LocalId, RemoteId, TaskSpec, TaskStatus};

/// Internal node structure: a task spec plus adjacency and live status.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub spec: TaskSpec,
    /// Direct dependencies: tasks that must finish before this one is submitted.
    pub deps: Vec<LocalId>,
    /// Direct dependents: tasks that list this one as a dependency.
    pub dependents: Vec<LocalId>,
    pub status: TaskStatus,
}

/// A validated DAG of task specs, ready for submission.
///
/// The structure (nodes and edges) is fixed at `build()` time; only per-node
/// `status` and `remote_id` change afterwards, and only through the
/// submission engine. A node in a terminal status is never mutated again.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<LocalId, TaskNode>,
    /// A valid topological order over the nodes, captured at build time.
    topo: Vec<LocalId>,
}

impl TaskGraph {
    pub(crate) fn new(nodes: BTreeMap<LocalId, TaskNode>, topo: Vec<LocalId>) -> Self {
        Self { nodes, topo }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    /// Node ids in a valid topological order (dependencies first).
    pub fn topo_order(&self) -> &[LocalId] {
        &self.topo
    }

    pub fn dependencies_of(&self, id: &str) -> &[LocalId] {
        self.nodes.get(id).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: &str) -> &[LocalId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.nodes.get(id).map(|n| n.status)
    }

    pub fn remote_id_of(&self, id: &str) -> Option<&RemoteId> {
        self.nodes.get(id).and_then(|n| n.spec.remote_id.as_ref())
    }

    /// Snapshot of every node's current status, keyed by local id.
    pub fn statuses(&self) -> BTreeMap<LocalId, TaskStatus> {
        self.nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.status))
            .collect()
    }

    /// Remote ids of every node that has been assigned one.
    pub fn remote_ids(&self) -> Vec<RemoteId> {
        self.topo
            .iter()
            .filter_map(|id| self.remote_id_of(id).cloned())
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// Set a node's status. Terminal nodes are left untouched.
    pub(crate) fn set_status(&mut self, id: &str, status: TaskStatus) {
        if let Some(node) = self.nodes.get_mut(id) {
            if !node.status.is_terminal() {
                node.status = status;
            }
        }
    }

    pub(crate) fn set_remote_id(&mut self, id: &str, remote_id: RemoteId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.spec.remote_id = Some(remote_id);
        }
    }
}
