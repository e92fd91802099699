// src/lib.rs

pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod poll;
pub mod submit;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::client::{Credential, HttpTransport, Transport};
use crate::config::Manifest;
use crate::errors::RelayError;
use crate::graph::{TaskGraph, TaskStatus};
use crate::poll::{PollOptions, Poller};
use crate::submit::{SubmissionEngine, SubmitOptions};

/// Environment variable holding the bearer token for the session.
pub const TOKEN_ENV_VAR: &str = "DAGRELAY_TOKEN";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading and validation
/// - optional resource-affinity lookups
/// - graph construction
/// - submission
/// - completion polling
/// and prints the final status map on stdout.
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest = config::load_and_validate(&args.manifest)?;

    if args.dry_run {
        print_dry_run(&manifest);
        return Ok(());
    }

    let credential = match &args.token_file {
        Some(path) => Credential::from_file(path)?,
        None => Credential::from_env(TOKEN_ENV_VAR)?,
    };
    let transport = HttpTransport::new(&args.server, args.request_timeout_ms)?;

    let affinity = if args.prefer_best {
        lookup_affinity(&manifest, &transport, &credential).await?
    } else {
        BTreeMap::new()
    };

    let mut graph = config::build_graph(&manifest, &affinity)?;
    info!(
        tasks = graph.len(),
        instance = %manifest.workflow.instance,
        "submitting task graph"
    );

    let interval = Duration::from_millis(args.poll_interval_ms);
    let timeout = Duration::from_secs(args.poll_timeout_secs);

    let engine = SubmissionEngine::new(SubmitOptions {
        poll_interval: interval,
        wait_timeout: timeout,
    });
    let report = engine.submit(&mut graph, &transport, &credential).await?;

    if let Some(err) = &report.first_error {
        warn!(error = %err, failed = report.failed_ids().len(), "some tasks failed during submission");
    }

    let remote_ids = graph.remote_ids();
    let final_statuses = if remote_ids.is_empty() {
        BTreeMap::new()
    } else {
        let poller = Poller::new(PollOptions { interval, timeout });
        poller.wait_for(&remote_ids, &transport, &credential).await?
    };

    let failed = print_status_map(&graph, &final_statuses);

    if let Some(err) = report.first_error {
        bail!("submission failed: {err}");
    }
    if failed > 0 {
        bail!("{failed} task(s) ended in a failed status");
    }

    Ok(())
}

/// Ask the control plane for the best resource per service, strictly one
/// lookup at a time.
async fn lookup_affinity(
    manifest: &Manifest,
    transport: &HttpTransport,
    credential: &Credential,
) -> Result<BTreeMap<String, String>> {
    let user = manifest.workflow.user.clone().unwrap_or_default();

    // Only services that don't pin a resource in the manifest.
    let services: BTreeSet<String> = manifest
        .task
        .values()
        .filter(|entry| entry.prefer_resource.is_none())
        .map(|entry| entry.service.clone())
        .collect();

    let affinity = std::cell::RefCell::new(BTreeMap::new());
    batch::for_each_sequential(services, |service| {
        let credential = credential.clone();
        let user = user.clone();
        let affinity = &affinity;
        async move {
            if let Some(resource_id) = transport
                .best_resource(credential, service.clone(), user)
                .await?
            {
                info!(service = %service, resource = %resource_id, "using best resource as affinity hint");
                affinity.borrow_mut().insert(service, resource_id);
            }
            Ok::<(), RelayError>(())
        }
    })
    .await?;

    Ok(affinity.into_inner())
}

/// Print the final status of every node; returns the number of failures.
fn print_status_map(graph: &TaskGraph, final_statuses: &BTreeMap<String, TaskStatus>) -> usize {
    let mut failed = 0;

    for node in graph.nodes() {
        let status = node
            .spec
            .remote_id
            .as_ref()
            .and_then(|remote_id| final_statuses.get(remote_id).copied())
            .unwrap_or(node.status);

        if status == TaskStatus::Failed {
            failed += 1;
        }
        println!("{}: {status}", node.spec.local_id);
    }

    failed
}

/// Simple dry-run output: print workflow, tasks and dependency edges.
fn print_dry_run(manifest: &Manifest) {
    println!("dagrelay dry-run");
    println!("  workflow.instance = {}", manifest.workflow.instance);
    if let Some(user) = &manifest.workflow.user {
        println!("  workflow.user = {user}");
    }
    println!();

    println!("tasks ({}):", manifest.task.len());
    for (name, task) in manifest.task.iter() {
        println!("  - {name}");
        println!("      service: {}", task.service);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if let Some(resource) = &task.prefer_resource {
            println!("      prefer_resource: {resource}");
        }
        if let Some(secs) = task.remove_after_secs {
            println!("      remove_after_secs: {secs}");
        }
        if !task.config.is_empty() {
            println!("      config keys: {:?}", task.config.keys().collect::<Vec<_>>());
        }
    }
}
