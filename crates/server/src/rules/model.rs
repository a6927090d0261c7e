use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An alert rule as authored by users and mirrored into a Kapacitor task.
///
/// Collection fields are `Option` so that a rule decoded from a client or
/// from the engine keeps the difference between "absent" and "empty"; the
/// translator fills every one of them before a rule leaves the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub query: Option<QueryConfig>,
    #[serde(default)]
    pub every: String,
    #[serde(default)]
    pub alerts: Option<Vec<String>>,
    #[serde(default)]
    pub alert_nodes: Option<Vec<KapacitorNode>>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub trigger: String,
    #[serde(default, rename = "values")]
    pub trigger_values: TriggerValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerValues {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub change: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub period: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shift: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default)]
    pub range_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub measurement: String,
    #[serde(default)]
    pub retention_policy: String,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub are_tags_accepted: bool,
}

impl QueryConfig {
    /// True when at least one selected field applies an aggregation.
    pub fn has_funcs(&self) -> bool {
        self.fields
            .iter()
            .flatten()
            .any(|f| f.funcs.as_ref().is_some_and(|funcs| !funcs.is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub funcs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// An alert handler node (`.slack()`, `.email('ops@example.com')`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KapacitorNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub properties: Option<Vec<KapacitorProperty>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KapacitorProperty {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enabled,
    Disabled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!("Invalid Kapacitor status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_rule() {
        let json = r#"{
            "name": "cpu high",
            "every": "1m",
            "trigger": "threshold",
            "values": {"operator": "greater than", "value": "90", "rangeValue": ""},
            "query": {
                "database": "telegraf",
                "retentionPolicy": "autogen",
                "measurement": "cpu",
                "fields": [{"field": "usage_user", "funcs": ["mean"]}],
                "groupBy": {"time": "", "tags": ["host"]},
                "areTagsAccepted": true
            },
            "alertNodes": [{"name": "slack"}]
        }"#;
        let rule: AlertRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.trigger_values.operator, "greater than");
        let query = rule.query.unwrap();
        assert_eq!(query.retention_policy, "autogen");
        assert!(query.has_funcs());
        assert!(query.tags.is_none());
        assert!(rule.alerts.is_none());
        assert_eq!(rule.alert_nodes.unwrap()[0].name, "slack");
    }

    #[test]
    fn null_collections_stay_absent() {
        let rule: AlertRule = serde_json::from_str(r#"{"alerts": null}"#).unwrap();
        assert!(rule.alerts.is_none());
        assert!(rule.query.is_none());
    }

    #[test]
    fn empty_funcs_do_not_count() {
        let query = QueryConfig {
            fields: Some(vec![Field {
                field: "usage".into(),
                funcs: Some(vec![]),
            }]),
            ..Default::default()
        };
        assert!(!query.has_funcs());
    }

    #[test]
    fn status_parses_only_known_values() {
        assert_eq!("enabled".parse::<TaskStatus>(), Ok(TaskStatus::Enabled));
        assert_eq!("disabled".parse::<TaskStatus>(), Ok(TaskStatus::Disabled));
        assert!("Enabled".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }
}
