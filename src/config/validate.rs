// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{RelayError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = RelayError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.workflow, raw.task))
    }
}

fn validate_raw_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_tasks(raw)?;
    validate_workflow(raw)?;
    validate_task_dependencies(raw)?;
    validate_dag(raw)?;
    Ok(())
}

fn ensure_has_tasks(raw: &RawManifest) -> Result<()> {
    if raw.task.is_empty() {
        return Err(RelayError::ConfigError(
            "manifest must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_workflow(raw: &RawManifest) -> Result<()> {
    if raw.workflow.instance.trim().is_empty() {
        return Err(RelayError::ConfigError(
            "[workflow].instance must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(raw: &RawManifest) -> Result<()> {
    for (name, task) in raw.task.iter() {
        for dep in task.after.iter() {
            if !raw.task.contains_key(dep) {
                return Err(RelayError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(RelayError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(raw: &RawManifest) -> Result<()> {
    // Edge direction: dep -> task. For:
    //   [task.archive]
    //   after = ["dump"]
    // we add edge dump -> archive.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in raw.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in raw.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort fails iff there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(RelayError::Cycle(format!(
                "cycle detected in manifest task DAG involving task '{}'",
                node
            )))
        }
    }
}
