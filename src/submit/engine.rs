// src/submit/engine.rs

//! Topological drain of a [`TaskGraph`] against the control plane.
//!
//! Submission and completion polling interleave: the engine submits every
//! ready node, then watches in-flight dependencies until new nodes become
//! ready, until no node is left pending. Leaf completion is not awaited
//! here; callers hand the reported remote ids to the
//! [`Poller`](crate::poll::Poller) when they want to wait for the whole
//! batch to finish.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::client::{CreateTask, Credential, Transport};
use crate::errors::{RelayError, Result};
use crate::graph::{LocalId, RemoteId, TaskGraph, TaskStatus};
use crate::poll::PollFilter;
use crate::poll::poller::poll_round;
use crate::submit::state::GraphState;

#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    /// Pause between dependency-status polls while waiting for nodes to
    /// become ready.
    pub poll_interval: Duration,
    /// Deadline for the whole drain; exceeding it surfaces
    /// [`RelayError::Timeout`] with the current status map.
    pub wait_timeout: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(600),
        }
    }
}

/// Aggregate result of one `submit` invocation: the status of every node
/// plus the first node-level error, if any. Independent branches of the DAG
/// complete even when one branch fails.
#[derive(Debug)]
pub struct SubmissionReport {
    pub statuses: BTreeMap<LocalId, TaskStatus>,
    pub first_error: Option<RelayError>,
}

impl SubmissionReport {
    pub fn failed_ids(&self) -> Vec<&LocalId> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == TaskStatus::Failed)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn all_submitted(&self) -> bool {
        self.statuses
            .values()
            .all(|status| *status != TaskStatus::Pending && *status != TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionEngine {
    options: SubmitOptions,
}

impl SubmissionEngine {
    pub fn new(options: SubmitOptions) -> Self {
        Self { options }
    }

    /// Drain the graph in dependency order.
    ///
    /// - A node is submitted only once every dependency has been confirmed
    ///   `finished` through polling, with its `deps` resolved to the
    ///   dependencies' remote ids.
    /// - A failed create-task call fails the node and all transitive
    ///   dependents without submitting them; other branches continue.
    /// - A node that already carries a remote id is marked submitted without
    ///   a second create-task call (idempotent resume).
    /// - Only [`RelayError::Auth`] and [`RelayError::Timeout`] (and an
    ///   escalated polling [`RelayError::Transport`]) abort the invocation;
    ///   everything else lands in the report.
    pub async fn submit<T>(
        &self,
        graph: &mut TaskGraph,
        transport: &T,
        credential: &Credential,
    ) -> Result<SubmissionReport>
    where
        T: Transport + ?Sized,
    {
        let deadline = Instant::now() + self.options.wait_timeout;
        let mut first_error: Option<RelayError> = None;

        loop {
            let ready = GraphState::new(graph).collect_ready();
            for id in ready {
                match self.submit_node(graph, transport, credential, &id).await {
                    Ok(()) => {}
                    Err(err @ RelayError::Auth { .. }) => return Err(err),
                    Err(err) => {
                        warn!(task = %id, error = %err, "create-task failed; failing dependents");
                        GraphState::new(graph).mark_failed_with_dependents(&id);
                        first_error.get_or_insert(err);
                    }
                }
            }

            if !GraphState::new(graph).has_pending() {
                break;
            }

            if Instant::now() >= deadline {
                return Err(RelayError::Timeout {
                    statuses: graph.statuses(),
                });
            }

            sleep(self.options.poll_interval).await;

            let watched = GraphState::new(graph).watched_remote_ids();
            let filter = PollFilter::for_ids(watched);
            let records = poll_round(transport, credential, &filter).await?;

            let mut state = GraphState::new(graph);
            state.apply_records(&records);
            let blocked = state.fail_blocked();
            if let Some(root) = blocked.first() {
                first_error.get_or_insert(RelayError::RemoteTask {
                    message: format!(
                        "a dependency of task '{root}' ended without finishing"
                    ),
                });
            }
        }

        let report = SubmissionReport {
            statuses: graph.statuses(),
            first_error,
        };
        info!(
            total = report.statuses.len(),
            failed = report.failed_ids().len(),
            "submission drain complete"
        );
        Ok(report)
    }

    /// Submit one ready node. All dependencies are `finished` at this point,
    /// so each has a known remote id.
    async fn submit_node<T>(
        &self,
        graph: &mut TaskGraph,
        transport: &T,
        credential: &Credential,
        id: &LocalId,
    ) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        if let Some(remote_id) = graph.remote_id_of(id).cloned() {
            info!(task = %id, remote_id = %remote_id, "remote id already known; skipping submission");
            graph.set_status(id, TaskStatus::Submitted);
            return Ok(());
        }

        let payload = build_payload(graph, id)?;
        let record = transport.create_task(credential.clone(), payload).await?;
        GraphState::new(graph).mark_submitted(id, record.id);
        Ok(())
    }
}

fn build_payload(graph: &TaskGraph, id: &LocalId) -> Result<CreateTask> {
    let node = graph
        .node(id)
        .ok_or_else(|| RelayError::UnknownNode(id.clone()))?;

    let mut deps: Vec<RemoteId> = Vec::with_capacity(node.deps.len());
    for dep in &node.deps {
        let remote_id = graph
            .remote_id_of(dep)
            .ok_or_else(|| RelayError::UnknownNode(dep.clone()))?;
        deps.push(remote_id.clone());
    }

    Ok(CreateTask {
        instance_id: node.spec.instance_id.clone(),
        service: node.spec.service.clone(),
        config: node.spec.config.clone(),
        preferred_resource_id: node.spec.preferred_resource_id.clone(),
        deps,
        remove_at: node.spec.remove_at,
    })
}
