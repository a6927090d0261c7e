use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use super::params::{decode_json, parse_id};
use crate::error::ApiError;
use crate::kapacitor::{RemoteError, Task, TaskEngine};
use crate::rest::AppState;
use crate::rules::{
    alert_response, validate_rule, validate_status, AlertResponse, AlertRule, AlertRulesResponse,
    TaskStatus,
};
use crate::scope;
use crate::store::KapacitorRecord;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// Opens a client for a resolved instance.
pub(super) fn connect(
    state: &AppState,
    srv: &KapacitorRecord,
) -> Result<Box<dyn TaskEngine>, ApiError> {
    state.engines.connect(srv).map_err(|err| {
        warn!(src_id = srv.src_id, kapa_id = srv.id, error = %err, "kapacitor client setup failed");
        ApiError::from_remote(err, srv.id)
    })
}

/// A resolved instance plus a fresh engine client for it.
struct Scoped {
    srv: KapacitorRecord,
    engine: Box<dyn TaskEngine>,
}

impl Scoped {
    async fn resolve(state: &AppState, src: &str, kid: &str) -> Result<Self, ApiError> {
        let kapa_id = parse_id(kid)?;
        let src_id = parse_id(src)?;
        let srv = scope::resolve(state.kapacitors.as_ref(), src_id, kapa_id).await?;
        let engine = connect(&state, &srv)?;
        Ok(Self { srv, engine })
    }

    fn remote_failure(&self, err: RemoteError, task_id: &str) -> ApiError {
        if err != RemoteError::NotFound {
            warn!(
                src_id = self.srv.src_id,
                kapa_id = self.srv.id,
                task_id,
                error = %err,
                "kapacitor request failed"
            );
        }
        ApiError::from_remote(err, self.srv.id)
    }

    fn respond(
        &self,
        rule: AlertRule,
        tickscript: String,
        status: TaskStatus,
    ) -> AlertResponse {
        let href = self.engine.href(&rule.id);
        let href_output = self.engine.href_output(&rule.id);
        alert_response(
            rule,
            tickscript,
            &href,
            &href_output,
            status,
            self.srv.src_id,
            self.srv.id,
        )
    }

    /// Fetches a task, treating an engine-side miss as out of scope.
    async fn existing(&self, tid: &str) -> Result<Task, ApiError> {
        self.engine
            .get(tid)
            .await
            .map_err(|e| self.remote_failure(e, tid))
    }
}

pub async fn list_rules(
    State(state): State<AppState>,
    Path((src, kid)): Path<(String, String)>,
) -> Result<Json<AlertRulesResponse>, ApiError> {
    let scoped = Scoped::resolve(&state, &src, &kid).await?;
    let tasks = scoped
        .engine
        .all()
        .await
        .map_err(|e| scoped.remote_failure(e, "*"))?;
    let statuses = scoped
        .engine
        .all_status()
        .await
        .map_err(|e| scoped.remote_failure(e, "*"))?;

    // Tasks the engine lists without a status are not scheduled; skip them.
    let rules = tasks
        .into_iter()
        .filter_map(|task| {
            let status = *statuses.get(&task.id)?;
            Some(scoped.respond(task.rule, task.tickscript, status))
        })
        .collect();
    Ok(Json(AlertRulesResponse { rules }))
}

pub async fn create_rule(
    State(state): State<AppState>,
    Path((src, kid)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let scoped = Scoped::resolve(&state, &src, &kid).await?;
    let rule: AlertRule = decode_json(&body)?;
    validate_rule(&rule)?;

    let task = scoped
        .engine
        .create(&rule)
        .await
        .map_err(|e| scoped.remote_failure(e, ""))?;
    info!(
        src_id = scoped.srv.src_id,
        kapa_id = scoped.srv.id,
        task_id = %task.id,
        "rule created"
    );

    let res = alert_response(
        task.rule,
        task.tickscript,
        &task.href,
        &task.href_output,
        task.status,
        scoped.srv.src_id,
        scoped.srv.id,
    );
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, res.links.self_link.clone())],
        Json(res),
    ))
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path((src, kid, tid)): Path<(String, String, String)>,
) -> Result<Json<AlertResponse>, ApiError> {
    let scoped = Scoped::resolve(&state, &src, &kid).await?;
    let task = scoped.existing(&tid).await?;
    let status = scoped
        .engine
        .status(&task.href)
        .await
        .map_err(|e| scoped.remote_failure(e, &tid))?;
    Ok(Json(scoped.respond(task.rule, task.tickscript, status)))
}

/// Replaces the rule wholesale; nothing of the previous definition survives.
pub async fn replace_rule(
    State(state): State<AppState>,
    Path((src, kid, tid)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<AlertResponse>, ApiError> {
    let scoped = Scoped::resolve(&state, &src, &kid).await?;
    let mut rule: AlertRule = decode_json(&body)?;
    rule.id = tid.clone();
    validate_rule(&rule)?;

    scoped.existing(&tid).await?;
    let href = scoped.engine.href(&tid);
    let task = scoped
        .engine
        .update(&href, &rule)
        .await
        .map_err(|e| scoped.remote_failure(e, &tid))?;
    Ok(Json(scoped.respond(task.rule, task.tickscript, task.status)))
}

pub async fn set_rule_status(
    State(state): State<AppState>,
    Path((src, kid, tid)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<AlertResponse>, ApiError> {
    let scoped = Scoped::resolve(&state, &src, &kid).await?;
    let req: StatusRequest = decode_json(&body)?;
    let status = validate_status(&req.status)?;

    let current = scoped.existing(&tid).await?;
    let href = scoped.engine.href(&tid);
    let task = match status {
        TaskStatus::Enabled => scoped.engine.enable(&href).await,
        TaskStatus::Disabled => scoped.engine.disable(&href).await,
    }
    .map_err(|e| scoped.remote_failure(e, &tid))?;
    Ok(Json(scoped.respond(current.rule, task.tickscript, status)))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path((src, kid, tid)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let scoped = Scoped::resolve(&state, &src, &kid).await?;
    scoped.existing(&tid).await?;
    let href = scoped.engine.href(&tid);
    scoped
        .engine
        .delete(&href)
        .await
        .map_err(|e| scoped.remote_failure(e, &tid))?;
    info!(
        src_id = scoped.srv.src_id,
        kapa_id = scoped.srv.id,
        task_id = %tid,
        "rule deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
