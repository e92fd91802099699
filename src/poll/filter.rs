// src/poll/filter.rs

//! Query filter for listing tasks on the control plane.

use serde_json::{Value, json};

use crate::graph::{RemoteId, TaskStatus};

/// Criteria for querying existing tasks. Read-only; never mutates server
/// state. Serialized into the `find=<json>` query parameter of
/// `GET /task`.
#[derive(Debug, Clone, Default)]
pub struct PollFilter {
    pub instance_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub name: Option<String>,
    /// Match tasks carrying all of these tags.
    pub tags: Vec<String>,
    /// Restrict to this set of remote ids.
    pub remote_ids: Vec<RemoteId>,
}

impl PollFilter {
    /// Filter matching exactly the given remote ids.
    pub fn for_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RemoteId>,
    {
        Self {
            remote_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Build the JSON document for the `find` query parameter.
    pub fn to_find_document(&self) -> Value {
        let mut doc = serde_json::Map::new();

        if let Some(instance_id) = &self.instance_id {
            doc.insert("instanceId".to_string(), json!(instance_id));
        }
        if let Some(status) = self.status {
            doc.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(name) = &self.name {
            doc.insert("name".to_string(), json!(name));
        }
        if !self.tags.is_empty() {
            doc.insert("tags".to_string(), json!({ "$all": self.tags }));
        }
        if !self.remote_ids.is_empty() {
            doc.insert("_id".to_string(), json!({ "$in": self.remote_ids }));
        }

        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_document_includes_only_set_fields() {
        let filter = PollFilter::default()
            .with_instance("i1")
            .with_status(TaskStatus::Finished)
            .with_name("backup");

        let doc = filter.to_find_document();
        assert_eq!(doc["instanceId"], "i1");
        assert_eq!(doc["status"], "finished");
        assert_eq!(doc["name"], "backup");
        assert!(doc.get("tags").is_none());
        assert!(doc.get("_id").is_none());
    }

    #[test]
    fn find_document_for_ids() {
        let filter = PollFilter::for_ids(["t1", "t2"]);
        let doc = filter.to_find_document();
        assert_eq!(doc["_id"]["$in"], json!(["t1", "t2"]));
    }

    #[test]
    fn find_document_tags_use_all_matcher() {
        let filter = PollFilter::default().with_tag("nightly").with_tag("backup");
        let doc = filter.to_find_document();
        assert_eq!(doc["tags"]["$all"], json!(["nightly", "backup"]));
    }
}
