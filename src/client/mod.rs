// src/client/mod.rs

//! Transport seam towards the remote control plane.
//!
//! The orchestration core never talks HTTP directly; it goes through the
//! [`Transport`] trait. Production code uses [`HttpTransport`]; tests can
//! provide their own implementation that records payloads and scripts
//! responses without a server.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::errors::{RelayError, Result};
use crate::graph::{RemoteId, TaskStatus};
use crate::poll::PollFilter;

pub mod http;

pub use http::HttpTransport;

/// Opaque bearer token for the session.
///
/// Read-only shared state: every component receives it by reference and none
/// mutates it. Refreshing an expired token is the caller's responsibility;
/// the core treats it as valid for the duration of one submission/poll cycle.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Load the token from an environment variable.
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim().to_string())),
            _ => Err(RelayError::ConfigError(format!(
                "no bearer token found in environment variable {var}"
            ))),
        }
    }

    /// Load the token from a file, trimming surrounding whitespace.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let token = std::fs::read_to_string(path)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(RelayError::ConfigError(
                "token file is empty".to_string(),
            ));
        }
        Ok(Self::new(token.to_string()))
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keep the token out of debug output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

/// Wire payload for `POST /task`. Field names follow the control plane's
/// camelCase convention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub instance_id: String,
    pub service: String,
    pub config: std::collections::BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_resource_id: Option<String>,
    /// Remote ids of every dependency, resolved before submission.
    pub deps: Vec<RemoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_at: Option<u64>,
}

/// Server-side view of a task, as returned by the control plane.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "_id")]
    pub id: RemoteId,
    pub status: TaskStatus,
    #[serde(default)]
    pub name: Option<String>,
}

/// Boxed future alias used by [`Transport`] to stay object-safe.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait abstracting the control plane's REST surface.
///
/// Contract shared by all implementations:
/// - every call carries `Authorization: Bearer <token>`;
/// - a 401/403 response surfaces as [`RelayError::Auth`] and is never
///   retried at this layer;
/// - a non-success create-task response surfaces as
///   [`RelayError::RemoteTask`] with the server's `message`;
/// - network-level failures surface as [`RelayError::Transport`].
pub trait Transport: Send + Sync {
    /// `POST /task`: submit one task and return the created record.
    fn create_task(&self, credential: Credential, task: CreateTask)
        -> TransportFuture<'_, TaskRecord>;

    /// `GET /task?find=<json>`: list tasks matching a filter. Read-only.
    fn list_tasks(&self, credential: Credential, filter: PollFilter)
        -> TransportFuture<'_, Vec<TaskRecord>>;

    /// `GET /resource/best?service=&user=`: resource-affinity lookup.
    /// Returns the id of the best resource, if the server knows one.
    fn best_resource(
        &self,
        credential: Credential,
        service: String,
        user: String,
    ) -> TransportFuture<'_, Option<String>>;
}
