#![allow(dead_code)]

use dagrelay::graph::{GraphBuilder, TaskGraph, TaskSpec};

/// A minimal task spec for tests; the service doubles as the local id so
/// recorded payloads are easy to assert on.
pub fn spec(local_id: &str) -> TaskSpec {
    TaskSpec::new(local_id, "inst-1", local_id)
}

/// Build a graph from a node list and `(from, to)` dependency edges, where
/// `from` depends on `to`.
pub fn graph_from(tasks: &[&str], edges: &[(&str, &str)]) -> TaskGraph {
    let mut builder = GraphBuilder::new();
    for id in tasks {
        builder.add_task(spec(id)).expect("unique test task id");
    }
    for (from, to) in edges {
        builder
            .add_dependency(from, to)
            .expect("valid test dependency");
    }
    builder.build().expect("non-empty test graph")
}

/// Linear chain: each task depends on the previous one.
pub fn chain(ids: &[&str]) -> TaskGraph {
    let edges: Vec<(&str, &str)> = ids.windows(2).map(|w| (w[1], w[0])).collect();
    graph_from(ids, &edges)
}
