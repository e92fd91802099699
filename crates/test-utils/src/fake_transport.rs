use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use dagrelay::client::{CreateTask, Credential, TaskRecord, Transport, TransportFuture};
use dagrelay::errors::RelayError;
use dagrelay::graph::{RemoteId, TaskStatus};
use dagrelay::poll::PollFilter;

/// In-memory control plane for tests.
///
/// - records every create-task payload in arrival order
/// - assigns remote ids `t1`, `t2`, ...
/// - serves list-tasks queries from a scriptable status table
/// - can reject auth, reject specific services, or fail a number of
///   list-tasks calls with transport errors
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    /// Created tasks complete immediately: their records show `finished`.
    auto_finish: bool,
    auth_fail: bool,
    fail_services: HashSet<String>,
    transport_failures_remaining: u32,
    records: BTreeMap<RemoteId, TaskStatus>,
    best_resources: BTreeMap<String, String>,
    created: Vec<CreateTask>,
    list_calls: u32,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every created task's server record immediately reads `finished`.
    pub fn auto_finishing() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().auto_finish = true;
        fake
    }

    /// Reject create-task calls for this service with a `RemoteTask` error.
    pub fn fail_service(self, service: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_services
            .insert(service.to_string());
        self
    }

    /// Reject every call with HTTP 401.
    pub fn reject_auth(self) -> Self {
        self.state.lock().unwrap().auth_fail = true;
        self
    }

    /// Fail the next `n` list-tasks calls with a transport error.
    pub fn fail_next_lists(self, n: u32) -> Self {
        self.state.lock().unwrap().transport_failures_remaining = n;
        self
    }

    /// Insert a server-side record directly (e.g. for resume scenarios).
    pub fn insert_record(&self, id: &str, status: TaskStatus) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(id.to_string(), status);
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) {
        self.insert_record(id, status);
    }

    pub fn set_best_resource(&self, service: &str, resource_id: &str) {
        self.state
            .lock()
            .unwrap()
            .best_resources
            .insert(service.to_string(), resource_id.to_string());
    }

    /// Every create-task payload, in arrival order.
    pub fn created(&self) -> Vec<CreateTask> {
        self.state.lock().unwrap().created.clone()
    }

    /// Service names of created tasks, in arrival order.
    pub fn created_services(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .map(|t| t.service.clone())
            .collect()
    }

    pub fn list_calls(&self) -> u32 {
        self.state.lock().unwrap().list_calls
    }
}

impl Transport for FakeTransport {
    fn create_task(
        &self,
        _credential: Credential,
        task: CreateTask,
    ) -> TransportFuture<'_, TaskRecord> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let mut state = state.lock().unwrap();
            if state.auth_fail {
                return Err(RelayError::Auth { status: 401 });
            }
            if state.fail_services.contains(&task.service) {
                return Err(RelayError::RemoteTask {
                    message: format!("service '{}' rejected", task.service),
                });
            }

            state.next_id += 1;
            let id = format!("t{}", state.next_id);
            let status = if state.auto_finish {
                TaskStatus::Finished
            } else {
                TaskStatus::Submitted
            };
            state.records.insert(id.clone(), status);
            state.created.push(task);

            Ok(TaskRecord {
                id,
                status: TaskStatus::Submitted,
                name: None,
            })
        })
    }

    fn list_tasks(
        &self,
        _credential: Credential,
        filter: PollFilter,
    ) -> TransportFuture<'_, Vec<TaskRecord>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let mut state = state.lock().unwrap();
            state.list_calls += 1;

            if state.auth_fail {
                return Err(RelayError::Auth { status: 401 });
            }
            if state.transport_failures_remaining > 0 {
                state.transport_failures_remaining -= 1;
                return Err(RelayError::Transport("injected failure".to_string()));
            }

            let mut records = Vec::new();
            for (id, status) in state.records.iter() {
                if !filter.remote_ids.is_empty() && !filter.remote_ids.contains(id) {
                    continue;
                }
                if let Some(wanted) = filter.status {
                    if wanted != *status {
                        continue;
                    }
                }
                records.push(TaskRecord {
                    id: id.clone(),
                    status: *status,
                    name: None,
                });
            }

            Ok(records)
        })
    }

    fn best_resource(
        &self,
        _credential: Credential,
        service: String,
        _user: String,
    ) -> TransportFuture<'_, Option<String>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let state = state.lock().unwrap();
            if state.auth_fail {
                return Err(RelayError::Auth { status: 401 });
            }
            Ok(state.best_resources.get(&service).cloned())
        })
    }
}
