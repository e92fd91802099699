// tests/submit_engine.rs

use std::time::Duration;

use dagrelay::client::Credential;
use dagrelay::errors::RelayError;
use dagrelay::graph::{GraphBuilder, TaskStatus};
use dagrelay::submit::{SubmissionEngine, SubmitOptions};
use dagrelay_test_utils::builders::{chain, graph_from, spec};
use dagrelay_test_utils::fake_transport::FakeTransport;
use dagrelay_test_utils::init_tracing;

fn fast_engine() -> SubmissionEngine {
    SubmissionEngine::new(SubmitOptions {
        poll_interval: Duration::from_millis(10),
        wait_timeout: Duration::from_secs(5),
    })
}

fn credential() -> Credential {
    Credential::new("test-token")
}

#[tokio::test]
async fn chain_is_submitted_in_dependency_order_with_resolved_deps() {
    init_tracing();

    let mut graph = chain(&["A", "B"]);
    let fake = FakeTransport::auto_finishing();

    let report = fast_engine()
        .submit(&mut graph, &fake, &credential())
        .await
        .unwrap();

    assert_eq!(fake.created_services(), ["A", "B"]);
    assert!(report.first_error.is_none());

    // B's payload carries A's server-assigned id.
    let created = fake.created();
    assert!(created[0].deps.is_empty());
    assert_eq!(created[1].deps, ["t1".to_string()]);

    // A was confirmed finished before B went out.
    assert_eq!(report.statuses["A"], TaskStatus::Finished);
    assert_eq!(report.statuses["B"], TaskStatus::Submitted);
}

#[tokio::test]
async fn each_node_is_submitted_exactly_once() {
    init_tracing();

    let mut graph = graph_from(
        &["A", "B", "C", "D"],
        &[("B", "A"), ("C", "A"), ("D", "B"), ("D", "C")],
    );
    let fake = FakeTransport::auto_finishing();

    fast_engine()
        .submit(&mut graph, &fake, &credential())
        .await
        .unwrap();

    let mut services = fake.created_services();
    assert_eq!(services.len(), 4);
    services.sort();
    services.dedup();
    assert_eq!(services.len(), 4);
}

#[tokio::test]
async fn create_failure_fails_transitive_dependents_without_submitting_them() {
    init_tracing();

    // A <- B <- C, plus an independent D.
    let mut graph = graph_from(&["A", "B", "C", "D"], &[("B", "A"), ("C", "B")]);
    let fake = FakeTransport::auto_finishing().fail_service("B");

    let report = fast_engine()
        .submit(&mut graph, &fake, &credential())
        .await
        .unwrap();

    assert_eq!(report.statuses["B"], TaskStatus::Failed);
    assert_eq!(report.statuses["C"], TaskStatus::Failed);
    // The independent branch still completed.
    assert_eq!(report.statuses["A"], TaskStatus::Finished);
    assert_ne!(report.statuses["D"], TaskStatus::Failed);

    // C was never sent to the transport.
    let services = fake.created_services();
    assert!(!services.contains(&"B".to_string()));
    assert!(!services.contains(&"C".to_string()));

    match report.first_error {
        Some(RelayError::RemoteTask { message }) => {
            assert!(message.contains("'B'"), "unexpected message: {message}")
        }
        other => panic!("expected RemoteTask first_error, got {other:?}"),
    }
}

#[tokio::test]
async fn node_with_known_remote_id_is_not_resubmitted() {
    init_tracing();

    let mut builder = GraphBuilder::new();
    builder
        .add_task(spec("A").with_remote_id("pre-1"))
        .unwrap();
    builder.add_task(spec("B")).unwrap();
    builder.add_dependency("B", "A").unwrap();
    let mut graph = builder.build().unwrap();

    let fake = FakeTransport::auto_finishing();
    // The server already knows about A from a previous run.
    fake.insert_record("pre-1", TaskStatus::Finished);

    let report = fast_engine()
        .submit(&mut graph, &fake, &credential())
        .await
        .unwrap();

    // Only B ever hit POST /task, and it depends on A's pre-existing id.
    assert_eq!(fake.created_services(), ["B"]);
    assert_eq!(fake.created()[0].deps, ["pre-1".to_string()]);
    assert_eq!(report.statuses["A"], TaskStatus::Finished);
}

#[tokio::test]
async fn auth_rejection_aborts_the_invocation() {
    init_tracing();

    let mut graph = chain(&["A"]);
    let fake = FakeTransport::new().reject_auth();

    let err = fast_engine()
        .submit(&mut graph, &fake, &credential())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Auth { status: 401 }));
}

#[tokio::test]
async fn dependency_wait_deadline_surfaces_timeout_with_status_map() {
    init_tracing();

    let mut graph = chain(&["A", "B"]);
    // Tasks never finish on this server.
    let fake = FakeTransport::new();

    let engine = SubmissionEngine::new(SubmitOptions {
        poll_interval: Duration::from_millis(10),
        wait_timeout: Duration::from_millis(80),
    });

    let err = engine
        .submit(&mut graph, &fake, &credential())
        .await
        .unwrap_err();
    match err {
        RelayError::Timeout { statuses } => {
            assert_eq!(statuses["A"], TaskStatus::Submitted);
            assert_eq!(statuses["B"], TaskStatus::Pending);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn remote_failure_observed_via_polling_fails_dependents() {
    init_tracing();

    let mut graph = chain(&["A", "B"]);
    let fake = FakeTransport::new();

    let engine = fast_engine();
    let cred = credential();
    let submit = engine.submit(&mut graph, &fake, &cred);

    // Let A be submitted, then have the server report it failed.
    let flipper = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        fake.set_status("t1", TaskStatus::Failed);
    };

    let (report, ()) = tokio::join!(submit, flipper);
    let report = report.unwrap();

    assert_eq!(report.statuses["A"], TaskStatus::Failed);
    assert_eq!(report.statuses["B"], TaskStatus::Failed);
    assert_eq!(fake.created_services(), ["A"]);
    assert!(report.first_error.is_some());
}
