// tests/submission_property.rs

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use proptest::prelude::*;

use dagrelay::client::Credential;
use dagrelay::graph::{GraphBuilder, TaskGraph, TaskStatus};
use dagrelay::submit::{SubmissionEngine, SubmitOptions};
use dagrelay_test_utils::builders::spec;
use dagrelay_test_utils::fake_transport::FakeTransport;

// Strategy for a random acyclic dependency structure.
// Acyclicity is guaranteed by only allowing task N to depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    // Sanitize: only deps strictly below our own index.
                    potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i)
                        .collect::<BTreeSet<usize>>()
                })
                .collect()
        })
    })
}

fn graph_from_deps(deps: &[BTreeSet<usize>]) -> TaskGraph {
    let mut builder = GraphBuilder::new();
    for i in 0..deps.len() {
        builder.add_task(spec(&format!("task_{i}"))).unwrap();
    }
    for (i, below) in deps.iter().enumerate() {
        for d in below {
            builder
                .add_dependency(&format!("task_{i}"), &format!("task_{d}"))
                .unwrap();
        }
    }
    builder.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Every node is created exactly once, every node ends terminal, and no
    // payload ever references a server id that did not exist yet at the time
    // the payload was sent.
    #[test]
    fn submission_respects_dependency_order(deps in dag_strategy(8)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut graph = graph_from_deps(&deps);
            let fake = FakeTransport::auto_finishing();

            let engine = SubmissionEngine::new(SubmitOptions {
                poll_interval: Duration::from_millis(1),
                wait_timeout: Duration::from_secs(10),
            });
            let report = engine
                .submit(&mut graph, &fake, &Credential::new("test-token"))
                .await
                .unwrap();

            prop_assert!(report.first_error.is_none());
            for (id, status) in &report.statuses {
                prop_assert!(
                    matches!(status, TaskStatus::Finished | TaskStatus::Submitted),
                    "task {id} ended as {status:?}"
                );
            }

            let created = fake.created();
            prop_assert_eq!(created.len(), deps.len(), "each node created exactly once");

            // Server ids are handed out as t1, t2, ... in creation order, so a
            // payload may only reference ids assigned before its own.
            let mut assigned_at: HashMap<String, usize> = HashMap::new();
            for (pos, payload) in created.iter().enumerate() {
                for dep_id in &payload.deps {
                    let dep_pos = assigned_at.get(dep_id);
                    prop_assert!(
                        dep_pos.is_some_and(|&p| p < pos),
                        "payload at position {pos} references {dep_id} which was not created earlier"
                    );
                }
                assigned_at.insert(format!("t{}", pos + 1), pos);
            }
            Ok(())
        })?;
    }
}
