use std::collections::BTreeMap;

use serde::Serialize;
use url::form_urlencoded;

use super::model::{AlertRule, Field, KapacitorNode, KapacitorProperty, QueryConfig, TaskStatus};
use crate::kapacitor::{ticker, Dbrp, TaskForm, Var, RULE_VAR};
use crate::API_PREFIX;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub kapacitor: String,
    pub output: String,
}

/// Outward representation of a rule living on a kapacitor instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertResponse {
    #[serde(flatten)]
    pub rule: AlertRule,
    pub tickscript: String,
    pub status: TaskStatus,
    pub links: AlertLinks,
}

#[derive(Debug, Serialize)]
pub struct AlertRulesResponse {
    pub rules: Vec<AlertResponse>,
}

/// Fills every optional collection with its empty form, recursively.
pub trait Normalize {
    fn normalize(&mut self);
}

fn filled<T>(slot: &mut Option<Vec<T>>) -> &mut Vec<T> {
    slot.get_or_insert_with(Vec::new)
}

impl Normalize for AlertRule {
    fn normalize(&mut self) {
        filled(&mut self.alerts);
        filled(&mut self.alert_nodes).iter_mut().for_each(Normalize::normalize);
        if let Some(query) = self.query.as_mut() {
            if query.id.is_empty() {
                query.id = self.id.clone();
            }
            query.normalize();
        }
    }
}

impl Normalize for KapacitorNode {
    fn normalize(&mut self) {
        filled(&mut self.args);
        filled(&mut self.properties).iter_mut().for_each(Normalize::normalize);
    }
}

impl Normalize for KapacitorProperty {
    fn normalize(&mut self) {
        filled(&mut self.args);
    }
}

impl Normalize for QueryConfig {
    fn normalize(&mut self) {
        filled(&mut self.fields).iter_mut().for_each(Normalize::normalize);
        filled(&mut self.group_by.tags);
        self.tags.get_or_insert_with(BTreeMap::new);
    }
}

impl Normalize for Field {
    fn normalize(&mut self) {
        filled(&mut self.funcs);
    }
}

fn proxy_link(src_id: i64, kapa_id: i64, path: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{API_PREFIX}/sources/{src_id}/kapacitors/{kapa_id}/proxy?path={encoded}")
}

pub fn alert_response(
    mut rule: AlertRule,
    tickscript: String,
    href: &str,
    href_output: &str,
    status: TaskStatus,
    src_id: i64,
    kapa_id: i64,
) -> AlertResponse {
    let links = AlertLinks {
        self_link: format!(
            "{API_PREFIX}/sources/{src_id}/kapacitors/{kapa_id}/rules/{}",
            rule.id
        ),
        kapacitor: proxy_link(src_id, kapa_id, href),
        output: proxy_link(src_id, kapa_id, href_output),
    };
    rule.normalize();
    AlertResponse {
        rule,
        tickscript,
        status,
        links,
    }
}

/// Builds the engine task body for `rule`. Defaults are left to the engine.
pub fn to_remote(rule: &AlertRule) -> Result<TaskForm, serde_json::Error> {
    let definition = serde_json::to_string(rule)?;
    let dbrps = rule
        .query
        .as_ref()
        .map(|q| {
            let rp = if q.retention_policy.is_empty() {
                "autogen".to_string()
            } else {
                q.retention_policy.clone()
            };
            vec![Dbrp {
                db: q.database.clone(),
                rp,
            }]
        })
        .unwrap_or_default();
    Ok(TaskForm {
        kind: "stream".into(),
        dbrps,
        script: ticker::generate(rule),
        vars: BTreeMap::from([(RULE_VAR.to_string(), Var::string(definition))]),
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GroupBy;

    fn bare_rule() -> AlertRule {
        AlertRule {
            id: "task-1".into(),
            name: "cpu".into(),
            query: Some(QueryConfig {
                database: "telegraf".into(),
                fields: Some(vec![Field {
                    field: "usage".into(),
                    funcs: None,
                }]),
                group_by: GroupBy::default(),
                ..Default::default()
            }),
            alert_nodes: Some(vec![KapacitorNode {
                name: "email".into(),
                args: None,
                properties: Some(vec![KapacitorProperty {
                    name: "subject".into(),
                    args: None,
                }]),
            }]),
            ..Default::default()
        }
    }

    fn respond(rule: AlertRule) -> AlertResponse {
        alert_response(
            rule,
            "stream".into(),
            "/kapacitor/v1/tasks/task-1",
            "/kapacitor/v1/tasks/task-1/output",
            TaskStatus::Enabled,
            1,
            2,
        )
    }

    #[test]
    fn links_route_through_proxy() {
        let res = respond(bare_rule());
        assert_eq!(
            res.links.self_link,
            "/chronograf/v1/sources/1/kapacitors/2/rules/task-1"
        );
        assert_eq!(
            res.links.kapacitor,
            "/chronograf/v1/sources/1/kapacitors/2/proxy?path=%2Fkapacitor%2Fv1%2Ftasks%2Ftask-1"
        );
        assert_eq!(
            res.links.output,
            "/chronograf/v1/sources/1/kapacitors/2/proxy?path=%2Fkapacitor%2Fv1%2Ftasks%2Ftask-1%2Foutput"
        );
    }

    #[test]
    fn every_collection_is_filled() {
        let json = serde_json::to_value(respond(bare_rule())).unwrap();
        assert_eq!(json["alerts"], serde_json::json!([]));
        assert_eq!(json["alertNodes"][0]["args"], serde_json::json!([]));
        assert_eq!(json["alertNodes"][0]["properties"][0]["args"], serde_json::json!([]));
        assert_eq!(json["query"]["fields"][0]["funcs"], serde_json::json!([]));
        assert_eq!(json["query"]["groupBy"]["tags"], serde_json::json!([]));
        assert_eq!(json["query"]["tags"], serde_json::json!({}));
        assert_eq!(json["status"], "enabled");
        assert_eq!(json["tickscript"], "stream");
    }

    #[test]
    fn missing_top_level_collections_are_filled() {
        let mut rule = bare_rule();
        rule.alert_nodes = None;
        rule.query.as_mut().unwrap().fields = None;
        let json = serde_json::to_value(respond(rule)).unwrap();
        assert_eq!(json["alertNodes"], serde_json::json!([]));
        assert_eq!(json["query"]["fields"], serde_json::json!([]));
    }

    #[test]
    fn query_id_defaults_to_rule_id_only_when_empty() {
        let res = respond(bare_rule());
        assert_eq!(res.rule.query.as_ref().unwrap().id, "task-1");

        let mut rule = bare_rule();
        rule.query.as_mut().unwrap().id = "q-7".into();
        let res = respond(rule);
        assert_eq!(res.rule.query.as_ref().unwrap().id, "q-7");
    }

    #[test]
    fn absent_query_stays_absent() {
        let mut rule = bare_rule();
        rule.query = None;
        let res = respond(rule);
        assert!(res.rule.query.is_none());
    }

    #[test]
    fn to_remote_embeds_rule_without_normalizing() {
        let rule = bare_rule();
        let form = to_remote(&rule).unwrap();
        assert_eq!(form.kind, "stream");
        assert_eq!(form.dbrps[0].db, "telegraf");
        assert_eq!(form.dbrps[0].rp, "autogen");
        let embedded = form.vars[RULE_VAR].value.as_str().unwrap();
        let decoded: AlertRule = serde_json::from_str(embedded).unwrap();
        assert_eq!(decoded, rule);
        assert!(decoded.alerts.is_none());
        assert!(form.script.contains("httpOut('output')"));
    }
}
