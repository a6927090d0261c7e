use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use dashmap::DashMap;

use super::engine::{
    task_id_from_href, EngineConnector, ProxyResponse, RemoteError, Task, TaskEngine,
};
use super::ticker;
use crate::rules::{AlertRule, TaskStatus};
use crate::store::KapacitorRecord;

#[derive(Debug, Clone)]
struct StoredTask {
    rule: AlertRule,
    tickscript: String,
    status: TaskStatus,
}

/// A Kapacitor stand-in holding tasks in memory.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    tasks: Arc<DashMap<String, StoredTask>>,
    next_id: Arc<AtomicU64>,
    calls: Arc<AtomicU64>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of engine operations served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn to_task(&self, id: &str, stored: &StoredTask) -> Task {
        Task {
            id: id.to_string(),
            href: self.href(id),
            href_output: self.href_output(id),
            rule: stored.rule.clone(),
            tickscript: stored.tickscript.clone(),
            status: stored.status,
        }
    }

    fn lookup(&self, href: &str) -> Result<(String, StoredTask), RemoteError> {
        let id = task_id_from_href(href).ok_or(RemoteError::NotFound)?;
        let stored = self.tasks.get(id).ok_or(RemoteError::NotFound)?;
        Ok((id.to_string(), stored.clone()))
    }

    fn set_status(&self, href: &str, status: TaskStatus) -> Result<Task, RemoteError> {
        self.touch();
        let id = task_id_from_href(href).ok_or(RemoteError::NotFound)?;
        let mut entry = self.tasks.get_mut(id).ok_or(RemoteError::NotFound)?;
        entry.status = status;
        Ok(self.to_task(id, &entry))
    }
}

#[async_trait]
impl TaskEngine for InMemoryEngine {
    async fn create(&self, rule: &AlertRule) -> Result<Task, RemoteError> {
        self.touch();
        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut rule = rule.clone();
        rule.id = id.clone();
        let stored = StoredTask {
            tickscript: ticker::generate(&rule),
            rule,
            status: TaskStatus::Enabled,
        };
        let task = self.to_task(&id, &stored);
        self.tasks.insert(id, stored);
        Ok(task)
    }

    async fn get(&self, id: &str) -> Result<Task, RemoteError> {
        self.touch();
        let stored = self.tasks.get(id).ok_or(RemoteError::NotFound)?;
        Ok(self.to_task(id, &stored))
    }

    async fn update(&self, href: &str, rule: &AlertRule) -> Result<Task, RemoteError> {
        self.touch();
        let (id, previous) = self.lookup(href)?;
        let mut rule = rule.clone();
        rule.id = id.clone();
        let stored = StoredTask {
            tickscript: ticker::generate(&rule),
            rule,
            status: previous.status,
        };
        let task = self.to_task(&id, &stored);
        self.tasks.insert(id, stored);
        Ok(task)
    }

    async fn enable(&self, href: &str) -> Result<Task, RemoteError> {
        self.set_status(href, TaskStatus::Enabled)
    }

    async fn disable(&self, href: &str) -> Result<Task, RemoteError> {
        self.set_status(href, TaskStatus::Disabled)
    }

    async fn delete(&self, href: &str) -> Result<(), RemoteError> {
        self.touch();
        let id = task_id_from_href(href).ok_or(RemoteError::NotFound)?;
        self.tasks.remove(id).map(|_| ()).ok_or(RemoteError::NotFound)
    }

    async fn all(&self) -> Result<Vec<Task>, RemoteError> {
        self.touch();
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .map(|e| self.to_task(e.key(), e.value()))
            .collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    async fn all_status(&self) -> Result<HashMap<String, TaskStatus>, RemoteError> {
        self.touch();
        Ok(self
            .tasks
            .iter()
            .map(|e| (e.key().clone(), e.value().status))
            .collect())
    }

    async fn status(&self, href: &str) -> Result<TaskStatus, RemoteError> {
        self.touch();
        self.lookup(href).map(|(_, stored)| stored.status)
    }

    async fn proxy(
        &self,
        method: Method,
        path: &str,
        _body: Bytes,
    ) -> Result<ProxyResponse, RemoteError> {
        self.touch();
        let found = if method == Method::GET {
            self.lookup(path).ok()
        } else {
            None
        };
        Ok(match found {
            Some((id, stored)) => ProxyResponse {
                status: 200,
                content_type: Some("application/json".into()),
                body: Bytes::from(
                    serde_json::json!({
                        "id": id,
                        "script": stored.tickscript,
                        "status": stored.status,
                    })
                    .to_string(),
                ),
            },
            None => ProxyResponse {
                status: 404,
                content_type: Some("application/json".into()),
                body: Bytes::from_static(br#"{"error":"not found"}"#),
            },
        })
    }
}

/// Independent in-memory engines keyed by instance URL.
#[derive(Clone, Default)]
pub struct InMemoryFleet {
    engines: Arc<DashMap<String, InMemoryEngine>>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine answering at `url`, created on first use.
    pub fn engine(&self, url: &str) -> InMemoryEngine {
        self.engines.entry(url.to_string()).or_default().clone()
    }
}

impl EngineConnector for InMemoryFleet {
    fn connect(&self, server: &KapacitorRecord) -> Result<Box<dyn TaskEngine>, RemoteError> {
        Ok(Box::new(self.engine(&server.url)))
    }
}
