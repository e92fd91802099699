// src/graph/task.rs

//! Task specifications and status lifecycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller-assigned identifier, unique within one graph. Used only for local
/// edge resolution; never sent to the server.
pub type LocalId = String;

/// Server-assigned identifier, returned on successful submission.
pub type RemoteId = String;

/// Lifecycle of a task as seen by this client.
///
/// `Pending → Submitted → Running → Finished | Failed | Removed`.
/// The last three are terminal: a task never transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Submitted,
    Running,
    Finished,
    Failed,
    Removed,
}

impl TaskStatus {
    /// Whether no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Failed | TaskStatus::Removed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Submitted => "submitted",
            TaskStatus::Running => "running",
            TaskStatus::Finished => "finished",
            TaskStatus::Failed => "failed",
            TaskStatus::Removed => "removed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work to submit to the control plane.
///
/// Dependency edges are not stored here; they are declared on the
/// [`GraphBuilder`](crate::graph::GraphBuilder) via `add_dependency` so the
/// builder can reject cycles at insert time.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub local_id: LocalId,
    /// Parent workflow instance this task belongs to.
    pub instance_id: String,
    /// Name of the remote service/image to execute.
    pub service: String,
    /// Arbitrary key→value parameters, passed through opaquely.
    pub config: BTreeMap<String, serde_json::Value>,
    /// Optional hint for where the server should schedule the task.
    pub preferred_resource_id: Option<String>,
    /// Optional expiry (epoch seconds) after which the server may
    /// garbage-collect the task's output.
    pub remove_at: Option<u64>,
    /// Assigned by the server on successful submission. May be pre-set by the
    /// caller when resuming a partially-submitted graph; such a node is never
    /// re-submitted.
    pub remote_id: Option<RemoteId>,
}

impl TaskSpec {
    pub fn new(
        local_id: impl Into<LocalId>,
        instance_id: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            instance_id: instance_id.into(),
            service: service.into(),
            config: BTreeMap::new(),
            preferred_resource_id: None,
            remove_at: None,
            remote_id: None,
        }
    }

    pub fn with_config_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn with_preferred_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.preferred_resource_id = Some(resource_id.into());
        self
    }

    pub fn with_remove_at(mut self, epoch_secs: u64) -> Self {
        self.remove_at = Some(epoch_secs);
        self
    }

    /// Pre-set the server-side id, for resuming a partially-submitted graph.
    pub fn with_remote_id(mut self, remote_id: impl Into<RemoteId>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }
}
