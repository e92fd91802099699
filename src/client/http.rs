// src/client/http.rs

//! Reqwest implementation of the [`Transport`] trait.

use serde::Deserialize;
use tracing::debug;

use crate::client::{CreateTask, Credential, TaskRecord, Transport, TransportFuture};
use crate::errors::{RelayError, Result};
use crate::poll::PollFilter;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Error body shape used by the control plane for non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    task: TaskRecord,
}

#[derive(Debug, Deserialize)]
struct BestResourceResponse {
    resource: Option<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    #[serde(rename = "_id")]
    id: String,
}

/// HTTP client for the control plane's REST surface.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url_task: String,
    url_resource_best: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|err| RelayError::Transport(err.to_string()))?;

        let normalized = base_url.trim_end_matches('/');
        Ok(Self {
            http,
            url_task: format!("{normalized}/task"),
            url_resource_best: format!("{normalized}/resource/best"),
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder, credential: &Credential) -> reqwest::RequestBuilder {
        req.bearer_auth(credential.token())
    }

    async fn do_create_task(
        &self,
        credential: Credential,
        task: CreateTask,
    ) -> Result<TaskRecord> {
        debug!(
            instance = %task.instance_id,
            service = %task.service,
            deps = task.deps.len(),
            "POST /task"
        );

        let req = self.http.post(&self.url_task).json(&task);
        let resp = self
            .auth(req, &credential)
            .send()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(create_error(status.as_u16(), read_body(resp).await));
        }

        let body: CreateTaskResponse = resp
            .json()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;
        debug!(remote_id = %body.task.id, "task created");
        Ok(body.task)
    }

    async fn do_list_tasks(
        &self,
        credential: Credential,
        filter: PollFilter,
    ) -> Result<Vec<TaskRecord>> {
        let find = filter.to_find_document().to_string();
        debug!(find = %find, "GET /task");

        let req = self.http.get(&self.url_task).query(&[("find", find)]);
        let resp = self
            .auth(req, &credential)
            .send()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(query_error(status.as_u16(), read_body(resp).await));
        }

        resp.json()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))
    }

    async fn do_best_resource(
        &self,
        credential: Credential,
        service: String,
        user: String,
    ) -> Result<Option<String>> {
        debug!(service = %service, user = %user, "GET /resource/best");

        let req = self
            .http
            .get(&self.url_resource_best)
            .query(&[("service", service.as_str()), ("user", user.as_str())]);
        let resp = self
            .auth(req, &credential)
            .send()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(query_error(status.as_u16(), read_body(resp).await));
        }

        let body: BestResourceResponse = resp
            .json()
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;
        Ok(body.resource.map(|r| r.id))
    }
}

impl Transport for HttpTransport {
    fn create_task(
        &self,
        credential: Credential,
        task: CreateTask,
    ) -> TransportFuture<'_, TaskRecord> {
        Box::pin(self.do_create_task(credential, task))
    }

    fn list_tasks(
        &self,
        credential: Credential,
        filter: PollFilter,
    ) -> TransportFuture<'_, Vec<TaskRecord>> {
        Box::pin(self.do_list_tasks(credential, filter))
    }

    fn best_resource(
        &self,
        credential: Credential,
        service: String,
        user: String,
    ) -> TransportFuture<'_, Option<String>> {
        Box::pin(self.do_best_resource(credential, service, user))
    }
}

/// Map a non-success create-task response to the right error variant.
fn create_error(status: u16, body: String) -> RelayError {
    if status == 401 || status == 403 {
        return RelayError::Auth { status };
    }

    // Non-200 bodies carry `{message}`; fall back to a raw preview.
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or_else(|_| preview_body(&body));
    RelayError::RemoteTask { message }
}

/// Map a non-success read-only query response. Unlike create-task failures
/// these are retryable at the polling layer, so they surface as `Transport`.
fn query_error(status: u16, body: String) -> RelayError {
    if status == 401 || status == 403 {
        return RelayError::Auth { status };
    }
    RelayError::Transport(format!("HTTP {status}: {}", preview_body(&body)))
}

async fn read_body(resp: reqwest::Response) -> String {
    resp.text().await.unwrap_or_default()
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn payload() -> CreateTask {
        CreateTask {
            instance_id: "i1".to_string(),
            service: "backup".to_string(),
            config: std::collections::BTreeMap::new(),
            preferred_resource_id: None,
            deps: vec![],
            remove_at: None,
        }
    }

    #[tokio::test]
    async fn create_task_parses_wrapped_record() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/task")
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::PartialJson(json!({
                "instanceId": "i1",
                "service": "backup",
                "deps": []
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"task": {"_id": "t-42", "status": "submitted"}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let record = transport
            .create_task(Credential::new("tok-1"), payload())
            .await
            .unwrap();
        assert_eq!(record.id, "t-42");
        assert_eq!(record.status, crate::graph::TaskStatus::Submitted);
    }

    #[tokio::test]
    async fn create_task_401_is_auth_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/task")
            .with_status(401)
            .with_body(r#"{"message": "token expired"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let err = transport
            .create_task(Credential::new("stale"), payload())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Auth { status: 401 }));
    }

    #[tokio::test]
    async fn create_task_error_body_message_is_surfaced() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/task")
            .with_status(422)
            .with_body(r#"{"message": "unknown service"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let err = transport
            .create_task(Credential::new("tok"), payload())
            .await
            .unwrap_err();
        match err {
            RelayError::RemoteTask { message } => assert_eq!(message, "unknown service"),
            other => panic!("expected RemoteTask, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_tasks_sends_find_document() {
        let mut server = Server::new_async().await;
        let expected = PollFilter::default()
            .with_instance("i1")
            .with_status(crate::graph::TaskStatus::Finished)
            .to_find_document()
            .to_string();
        let _m = server
            .mock("GET", "/task")
            .match_query(Matcher::UrlEncoded("find".to_string(), expected))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"_id": "t-1", "status": "finished", "name": "backup"}]"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let filter = PollFilter::default()
            .with_instance("i1")
            .with_status(crate::graph::TaskStatus::Finished);
        let records = transport
            .list_tasks(Credential::new("tok"), filter)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("backup"));
    }

    #[tokio::test]
    async fn list_tasks_server_error_is_transport() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/task")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let err = transport
            .list_tasks(Credential::new("tok"), PollFilter::for_ids(["t-1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }

    #[tokio::test]
    async fn best_resource_none_when_server_has_no_candidate() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/resource/best")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("service".to_string(), "backup".to_string()),
                Matcher::UrlEncoded("user".to_string(), "u1".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"resource": null}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let best = transport
            .best_resource(Credential::new("tok"), "backup".to_string(), "u1".to_string())
            .await
            .unwrap();
        assert_eq!(best, None);
    }

    #[tokio::test]
    async fn best_resource_returns_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/resource/best")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"resource": {"_id": "r-7"}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), 1_000).unwrap();
        let best = transport
            .best_resource(Credential::new("tok"), "backup".to_string(), "u1".to_string())
            .await
            .unwrap();
        assert_eq!(best.as_deref(), Some("r-7"));
    }

    #[test]
    fn preview_body_truncates() {
        let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
        let preview = preview_body(&body);
        assert!(preview.ends_with("..."));
        assert!(preview.chars().count() <= BODY_PREVIEW_LIMIT + 3);
    }
}
