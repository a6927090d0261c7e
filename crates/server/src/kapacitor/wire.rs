use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::engine::{RemoteError, Task, HTTP_ENDPOINT};
use crate::rules::{AlertRule, TaskStatus};

/// Task variable holding the JSON rule definition a task was generated from.
pub const RULE_VAR: &str = "rule_definition";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dbrp {
    pub db: String,
    pub rp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Var {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: serde_json::Value,
}

impl Var {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: "string".into(),
            value: serde_json::Value::String(value.into()),
        }
    }
}

/// Body of a task create or replace request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskForm {
    #[serde(rename = "type")]
    pub kind: String,
    pub dbrps: Vec<Dbrp>,
    pub script: String,
    pub vars: BTreeMap<String, Var>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
pub struct StatusForm {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    pub href: String,
}

/// A task as returned by the engine.
#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    pub id: String,
    #[serde(default)]
    pub link: Option<Link>,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub vars: BTreeMap<String, Var>,
}

#[derive(Debug, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<TaskPayload>,
}

#[derive(Debug, Deserialize)]
pub struct EngineError {
    pub error: String,
}

impl TaskPayload {
    /// Decodes the embedded rule; `None` for tasks not authored here.
    pub fn rule(&self) -> Option<AlertRule> {
        let raw = self.vars.get(RULE_VAR)?.value.as_str()?;
        let mut rule: AlertRule = serde_json::from_str(raw).ok()?;
        rule.id = self.id.clone();
        Some(rule)
    }

    pub fn into_task(self, fallback_href: String) -> Result<Task, RemoteError> {
        let rule = self.rule().ok_or(RemoteError::NotFound)?;
        let href = self.link.map(|l| l.href).unwrap_or(fallback_href);
        Ok(Task {
            href_output: format!("{href}/{HTTP_ENDPOINT}"),
            href,
            id: self.id,
            rule,
            tickscript: self.script,
            status: self.status.unwrap_or(TaskStatus::Disabled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(vars: serde_json::Value) -> TaskPayload {
        serde_json::from_value(serde_json::json!({
            "id": "task-1",
            "link": {"rel": "self", "href": "/kapacitor/v1/tasks/task-1"},
            "type": "stream",
            "script": "stream|from()",
            "status": "enabled",
            "executing": true,
            "vars": vars
        }))
        .unwrap()
    }

    #[test]
    fn decodes_embedded_rule_and_takes_task_id() {
        let rule = serde_json::json!({"id": "stale", "name": "cpu", "every": "1m"}).to_string();
        let task = payload(serde_json::json!({RULE_VAR: {"type": "string", "value": rule}}))
            .into_task("/unused".into())
            .unwrap();
        assert_eq!(task.rule.id, "task-1");
        assert_eq!(task.rule.name, "cpu");
        assert_eq!(task.href, "/kapacitor/v1/tasks/task-1");
        assert_eq!(task.href_output, "/kapacitor/v1/tasks/task-1/output");
        assert_eq!(task.status, TaskStatus::Enabled);
        assert_eq!(task.tickscript, "stream|from()");
    }

    #[test]
    fn unmanaged_task_has_no_rule() {
        let p = payload(serde_json::json!({}));
        assert!(p.rule().is_none());
        assert_eq!(p.into_task("/x".into()), Err(RemoteError::NotFound));
    }

    #[test]
    fn form_omits_missing_status() {
        let form = TaskForm {
            kind: "stream".into(),
            dbrps: vec![Dbrp {
                db: "telegraf".into(),
                rp: "autogen".into(),
            }],
            script: "stream".into(),
            vars: BTreeMap::new(),
            status: None,
        };
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["type"], "stream");
        assert!(json.get("status").is_none());
    }
}
