use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use thiserror::Error;

use crate::rules::{AlertRule, TaskStatus};
use crate::store::KapacitorRecord;

/// Task collection endpoint of the Kapacitor HTTP API.
pub const TASKS_PATH: &str = "/kapacitor/v1/tasks";
/// Name of the `httpOut` node every generated script ends with.
pub const HTTP_ENDPOINT: &str = "output";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("task not found")]
    NotFound,
    #[error("kapacitor unavailable: {0}")]
    Unavailable(String),
    #[error("kapacitor rejected request: {0}")]
    Rejected(String),
}

/// A rule as it currently exists on an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub href: String,
    pub href_output: String,
    pub rule: AlertRule,
    pub tickscript: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Task lifecycle operations against one Kapacitor instance.
#[async_trait]
pub trait TaskEngine: Send + Sync {
    /// Submits a new rule; the engine picks the task id.
    async fn create(&self, rule: &AlertRule) -> Result<Task, RemoteError>;
    async fn get(&self, id: &str) -> Result<Task, RemoteError>;
    /// Replaces the whole definition behind `href` with `rule`.
    async fn update(&self, href: &str, rule: &AlertRule) -> Result<Task, RemoteError>;
    async fn enable(&self, href: &str) -> Result<Task, RemoteError>;
    async fn disable(&self, href: &str) -> Result<Task, RemoteError>;
    async fn delete(&self, href: &str) -> Result<(), RemoteError>;
    /// Every task on the engine that carries a rule definition.
    async fn all(&self) -> Result<Vec<Task>, RemoteError>;
    async fn all_status(&self) -> Result<HashMap<String, TaskStatus>, RemoteError>;
    async fn status(&self, href: &str) -> Result<TaskStatus, RemoteError>;
    /// Forwards a raw request to `path` on the engine.
    async fn proxy(&self, method: Method, path: &str, body: Bytes)
        -> Result<ProxyResponse, RemoteError>;

    fn href(&self, id: &str) -> String {
        format!("{TASKS_PATH}/{id}")
    }

    fn href_output(&self, id: &str) -> String {
        format!("{}/{HTTP_ENDPOINT}", self.href(id))
    }
}

/// Builds a [`TaskEngine`] for a registered instance.
///
/// Called once per request so that credential or URL changes apply to the
/// next request without any shared connection table.
pub trait EngineConnector: Send + Sync {
    fn connect(&self, server: &KapacitorRecord) -> Result<Box<dyn TaskEngine>, RemoteError>;
}

/// Recovers the task id from an engine-relative task locator.
pub fn task_id_from_href(href: &str) -> Option<&str> {
    let id = href.strip_prefix(TASKS_PATH)?.strip_prefix('/')?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_round_trips_through_href() {
        assert_eq!(task_id_from_href("/kapacitor/v1/tasks/abc"), Some("abc"));
        assert_eq!(task_id_from_href("/kapacitor/v1/tasks/"), None);
        assert_eq!(task_id_from_href("/kapacitor/v1/tasks/abc/output"), None);
        assert_eq!(task_id_from_href("/other/abc"), None);
    }
}
