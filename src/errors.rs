// src/errors.rs

//! Crate-wide error type and helpers.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::graph::TaskStatus;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate task id in graph: {0}")]
    DuplicateId(String),

    #[error("Unknown task id: {0}")]
    UnknownNode(String),

    #[error("Cycle detected in task graph: {0}")]
    Cycle(String),

    #[error("Task graph contains no tasks")]
    EmptyGraph,

    #[error("Transport error: {0}")]
    Transport(String),

    /// Credential rejected by the control plane. Never retried here;
    /// refreshing the token is the credential holder's job.
    #[error("Credential rejected by server (HTTP {status})")]
    Auth { status: u16 },

    /// The control plane refused a create-task call with a non-success body.
    #[error("Server rejected task creation: {message}")]
    RemoteTask { message: String },

    /// Deadline elapsed before every watched task reached a terminal status.
    /// Carries the last status observed for each task.
    #[error("Timed out waiting for tasks to reach a terminal status")]
    Timeout {
        statuses: BTreeMap<String, TaskStatus>,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RelayError>;
