use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::engine::{
    EngineConnector, ProxyResponse, RemoteError, Task, TaskEngine, TASKS_PATH,
};
use super::wire::{EngineError, StatusForm, TaskList, TaskPayload};
use crate::rules::{to_remote, AlertRule, TaskStatus};
use crate::store::KapacitorRecord;

const PAGE_SIZE: usize = 100;

/// HTTP client for a single Kapacitor instance.
///
/// Every request goes to the host and port of `base`; callers only choose the
/// path and query.
pub struct Client {
    base: Url,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Unavailable(format!("request timed out: {e}"))
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

impl Client {
    pub fn new(
        url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base = Url::parse(url)
            .map_err(|e| RemoteError::Unavailable(format!("invalid kapacitor url {url}: {e}")))?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(RemoteError::Unavailable(format!(
                "invalid kapacitor url {url}: no host"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(format!("building http client: {e}")))?;
        Ok(Self {
            base,
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    /// Resolves `path` (and an optional raw query) against the instance.
    fn endpoint(&self, path: &str, query: Option<&str>) -> Result<Url, RemoteError> {
        if !path.starts_with('/') {
            return Err(RemoteError::Rejected(format!(
                "path must be absolute: {path}"
            )));
        }
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        if url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return Err(RemoteError::Rejected(format!(
                "path leaves the instance: {path}"
            )));
        }
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            req
        } else {
            req.basic_auth(&self.username, Some(&self.password))
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        let url = self.endpoint(path, None)?;
        Ok(self.authorized(self.http.request(method, url)))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = check(req.send().await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("decode: {e}")))
    }

    async fn patch_status(&self, href: &str, status: TaskStatus) -> Result<Task, RemoteError> {
        let req = self.request(Method::PATCH, href)?.json(&StatusForm { status });
        let payload: TaskPayload = self.send(req).await?;
        payload.into_task(href.to_string())
    }

    async fn list_page(&self, fields: &[&str], offset: usize) -> Result<TaskList, RemoteError> {
        let mut query = vec![
            ("limit".to_string(), PAGE_SIZE.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        query.extend(fields.iter().map(|f| ("fields".to_string(), f.to_string())));
        let req = self.request(Method::GET, TASKS_PATH)?.query(&query);
        self.send(req).await
    }

    async fn list(&self, fields: &[&str]) -> Result<Vec<TaskPayload>, RemoteError> {
        let mut tasks = Vec::new();
        loop {
            let page = self.list_page(fields, tasks.len()).await?;
            let n = page.tasks.len();
            tasks.extend(page.tasks);
            if n < PAGE_SIZE {
                return Ok(tasks);
            }
        }
    }
}

/// Engine task ids are single path segments.
fn is_task_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Maps non-success responses onto [`RemoteError`].
async fn check(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound);
    }
    let message = match resp.json::<EngineError>().await {
        Ok(body) => body.error,
        Err(_) => format!("unexpected status {status}"),
    };
    if status.is_client_error() {
        Err(RemoteError::Rejected(message))
    } else {
        Err(RemoteError::Unavailable(message))
    }
}

#[async_trait]
impl TaskEngine for Client {
    async fn create(&self, rule: &AlertRule) -> Result<Task, RemoteError> {
        let mut form = to_remote(rule).map_err(|e| RemoteError::Rejected(e.to_string()))?;
        form.status = Some(TaskStatus::Enabled);
        let req = self.request(Method::POST, TASKS_PATH)?.json(&form);
        let payload: TaskPayload = self.send(req).await?;
        let href = self.href(&payload.id);
        payload.into_task(href)
    }

    async fn get(&self, id: &str) -> Result<Task, RemoteError> {
        if !is_task_id(id) {
            return Err(RemoteError::NotFound);
        }
        let href = self.href(id);
        let payload: TaskPayload = self.send(self.request(Method::GET, &href)?).await?;
        payload.into_task(href)
    }

    async fn update(&self, href: &str, rule: &AlertRule) -> Result<Task, RemoteError> {
        let form = to_remote(rule).map_err(|e| RemoteError::Rejected(e.to_string()))?;
        let req = self.request(Method::PATCH, href)?.json(&form);
        let payload: TaskPayload = self.send(req).await?;
        payload.into_task(href.to_string())
    }

    async fn enable(&self, href: &str) -> Result<Task, RemoteError> {
        self.patch_status(href, TaskStatus::Enabled).await
    }

    async fn disable(&self, href: &str) -> Result<Task, RemoteError> {
        self.patch_status(href, TaskStatus::Disabled).await
    }

    async fn delete(&self, href: &str) -> Result<(), RemoteError> {
        check(self.request(Method::DELETE, href)?.send().await?).await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Task>, RemoteError> {
        let payloads = self.list(&[]).await?;
        Ok(payloads
            .into_iter()
            .filter_map(|p| {
                let href = self.href(&p.id);
                p.into_task(href).ok()
            })
            .collect())
    }

    async fn all_status(&self) -> Result<HashMap<String, TaskStatus>, RemoteError> {
        let payloads = self.list(&["status"]).await?;
        Ok(payloads
            .into_iter()
            .filter_map(|p| p.status.map(|s| (p.id, s)))
            .collect())
    }

    async fn status(&self, href: &str) -> Result<TaskStatus, RemoteError> {
        let req = self.request(Method::GET, href)?.query(&[("fields", "status")]);
        let payload: TaskPayload = self.send(req).await?;
        payload
            .status
            .ok_or_else(|| RemoteError::Unavailable(format!("task {} has no status", payload.id)))
    }

    async fn proxy(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
    ) -> Result<ProxyResponse, RemoteError> {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let url = self.endpoint(path, query)?;
        let mut req = self.authorized(self.http.request(method, url));
        if !body.is_empty() {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;
        Ok(ProxyResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Connects to instances over HTTP with a shared request timeout.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl EngineConnector for HttpConnector {
    fn connect(&self, server: &KapacitorRecord) -> Result<Box<dyn TaskEngine>, RemoteError> {
        let client = Client::new(
            &server.url,
            &server.username,
            &server.password,
            self.timeout,
        )?;
        Ok(Box::new(client))
    }
}
