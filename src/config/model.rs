// src/config/model.rs

//! Workflow manifest data model.
//!
//! A manifest describes one submission batch:
//!
//! ```toml
//! [workflow]
//! instance = "nightly-2024-11-02"
//! user = "ops"
//!
//! [task.dump]
//! service = "pg-dump"
//! config = { database = "main" }
//!
//! [task.archive]
//! service = "tar"
//! after = ["dump"]
//! prefer_resource = "storage-3"
//! remove_after_secs = 86400
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

/// Manifest as deserialized from TOML, before semantic validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    pub workflow: WorkflowSection,
    #[serde(default)]
    pub task: BTreeMap<String, TaskEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// Parent workflow instance id; every task in the batch belongs to it.
    pub instance: String,
    /// User on whose behalf resource-affinity lookups are made.
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskEntry {
    /// Remote service/image to execute.
    pub service: String,
    /// Opaque key→value parameters passed through to the server.
    #[serde(default)]
    pub config: BTreeMap<String, toml::Value>,
    /// Names of tasks that must finish before this one is submitted.
    #[serde(default)]
    pub after: Vec<String>,
    /// Pin the scheduling hint to a specific resource id.
    #[serde(default)]
    pub prefer_resource: Option<String>,
    /// Relative expiry; converted to an absolute timestamp at submission.
    #[serde(default)]
    pub remove_after_secs: Option<u64>,
}

/// A manifest that passed validation (all `after` references exist, no
/// self-dependencies, no cycles).
#[derive(Debug, Clone)]
pub struct Manifest {
    pub workflow: WorkflowSection,
    pub task: BTreeMap<String, TaskEntry>,
}

impl Manifest {
    /// Construct without validating; used by `TryFrom<RawManifest>` after
    /// the checks have run.
    pub(crate) fn new_unchecked(
        workflow: WorkflowSection,
        task: BTreeMap<String, TaskEntry>,
    ) -> Self {
        Self { workflow, task }
    }
}
