// src/submit/state.rs

//! State transitions over a [`TaskGraph`] during one submission run.
//!
//! The submission engine is the only writer; all transitions funnel through
//! here so the terminal-state invariant (a finished/failed/removed node is
//! never mutated again) lives in one place.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::client::TaskRecord;
use crate::graph::{LocalId, RemoteId, TaskGraph, TaskStatus};

pub(crate) struct GraphState<'a> {
    graph: &'a mut TaskGraph,
}

impl<'a> GraphState<'a> {
    pub fn new(graph: &'a mut TaskGraph) -> Self {
        Self { graph }
    }

    /// Pending nodes whose dependencies have all been confirmed `finished`,
    /// in topological order.
    pub fn collect_ready(&self) -> Vec<LocalId> {
        self.graph
            .topo_order()
            .iter()
            .filter(|id| {
                self.graph.status_of(id) == Some(TaskStatus::Pending)
                    && self
                        .graph
                        .dependencies_of(id)
                        .iter()
                        .all(|dep| self.graph.status_of(dep) == Some(TaskStatus::Finished))
            })
            .cloned()
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.graph
            .nodes()
            .any(|n| n.status == TaskStatus::Pending)
    }

    /// Record a successful create-task call.
    pub fn mark_submitted(&mut self, id: &str, remote_id: RemoteId) {
        debug!(task = %id, remote_id = %remote_id, "task submitted");
        self.graph.set_remote_id(id, remote_id);
        self.graph.set_status(id, TaskStatus::Submitted);
    }

    /// Fail a node and every transitive dependent that has not been
    /// submitted yet. Returns the newly failed dependents (excluding the
    /// root). Descendants are never sent to the transport.
    pub fn mark_failed_with_dependents(&mut self, failed: &str) -> Vec<LocalId> {
        self.graph.set_status(failed, TaskStatus::Failed);

        let mut stack: Vec<LocalId> = self.graph.dependents_of(failed).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(id) = stack.pop() {
            match self.graph.status_of(&id) {
                Some(TaskStatus::Pending) => {
                    warn!(
                        task = %id,
                        upstream = %failed,
                        "failing dependent due to upstream failure"
                    );
                    self.graph.set_status(&id, TaskStatus::Failed);
                    newly_failed.push(id.clone());
                    stack.extend(self.graph.dependents_of(&id).iter().cloned());
                }
                // Already submitted or terminal; the server owns it now.
                _ => {}
            }
        }

        newly_failed
    }

    /// Apply one poll round's records to the graph. Records are matched to
    /// nodes by remote id; terminal nodes are left untouched.
    pub fn apply_records(&mut self, records: &[TaskRecord]) {
        for record in records {
            let local = self
                .graph
                .nodes()
                .find(|n| n.spec.remote_id.as_deref() == Some(record.id.as_str()))
                .map(|n| n.spec.local_id.clone());

            if let Some(id) = local {
                self.graph.set_status(&id, record.status);
            }
        }
    }

    /// Fail pending nodes whose dependencies ended in a terminal status
    /// other than `finished` (failed remotely, or removed before the
    /// dependent could be submitted). Returns the failed roots.
    pub fn fail_blocked(&mut self) -> Vec<LocalId> {
        let blocked: Vec<(LocalId, LocalId)> = self
            .graph
            .topo_order()
            .iter()
            .filter(|id| self.graph.status_of(id) == Some(TaskStatus::Pending))
            .filter_map(|id| {
                self.graph
                    .dependencies_of(id)
                    .iter()
                    .find(|dep| {
                        matches!(
                            self.graph.status_of(dep),
                            Some(TaskStatus::Failed) | Some(TaskStatus::Removed)
                        )
                    })
                    .map(|dep| (id.clone(), dep.clone()))
            })
            .collect();

        let mut failed = Vec::new();
        for (id, dep) in blocked {
            if self.graph.status_of(&id) != Some(TaskStatus::Pending) {
                // Already failed via a previous root's propagation.
                continue;
            }
            warn!(task = %id, dep = %dep, "dependency ended non-finished; failing task");
            self.mark_failed_with_dependents(&id);
            failed.push(id);
        }

        failed
    }

    /// Remote ids the engine should watch: non-terminal submitted nodes that
    /// some pending node is (transitively) waiting on.
    pub fn watched_remote_ids(&self) -> Vec<RemoteId> {
        let mut ids: BTreeSet<RemoteId> = BTreeSet::new();

        for node in self.graph.nodes() {
            if matches!(node.status, TaskStatus::Submitted | TaskStatus::Running) {
                if let Some(remote_id) = &node.spec.remote_id {
                    ids.insert(remote_id.clone());
                }
            }
        }

        ids.into_iter().collect()
    }
}
