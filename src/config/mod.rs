// src/config/mod.rs

//! Workflow manifest loading and conversion into a task graph.

pub mod loader;
pub mod model;
pub mod validate;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub use loader::{load_and_validate, load_from_path};
pub use model::{Manifest, RawManifest, TaskEntry, WorkflowSection};

use crate::errors::Result;
use crate::graph::{GraphBuilder, TaskGraph, TaskSpec};

/// Build a [`TaskGraph`] from a validated manifest.
///
/// `affinity` maps service names to resource ids, typically filled from
/// `GET /resource/best` lookups; a task's own `prefer_resource` wins over
/// it. `remove_after_secs` entries are converted to absolute epoch
/// timestamps relative to now.
pub fn build_graph(manifest: &Manifest, affinity: &BTreeMap<String, String>) -> Result<TaskGraph> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut builder = GraphBuilder::new();

    for (name, entry) in manifest.task.iter() {
        let mut spec = TaskSpec::new(name.clone(), manifest.workflow.instance.clone(), entry.service.clone());

        for (key, value) in entry.config.iter() {
            spec = spec.with_config_value(key.clone(), toml_to_json(value.clone()));
        }

        let preferred = entry
            .prefer_resource
            .clone()
            .or_else(|| affinity.get(&entry.service).cloned());
        if let Some(resource_id) = preferred {
            spec = spec.with_preferred_resource(resource_id);
        }

        if let Some(secs) = entry.remove_after_secs {
            spec = spec.with_remove_at(now + secs);
        }

        builder.add_task(spec)?;
    }

    for (name, entry) in manifest.task.iter() {
        for dep in entry.after.iter() {
            builder.add_dependency(name, dep)?;
        }
    }

    builder.build()
}

/// Convert an opaque manifest config value into its wire representation.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::from(i),
        toml::Value::Float(f) => {
            serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
