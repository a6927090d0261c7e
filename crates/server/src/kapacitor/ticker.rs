//! TICKscript generation for alert rules.
//!
//! Output is a stream task: select and filter points, optionally window and
//! aggregate them into a `value` field, evaluate the trigger, fan out to the
//! configured handlers and expose the alert state on `httpOut('output')`.

use std::fmt::Write;

use super::engine::HTTP_ENDPOINT;
use super::wire::RULE_VAR;
use crate::rules::{AlertRule, KapacitorNode, QueryConfig};

const DEFAULT_RP: &str = "autogen";

pub fn generate(rule: &AlertRule) -> String {
    let empty = QueryConfig::default();
    let query = rule.query.as_ref().unwrap_or(&empty);

    let mut script = String::new();
    declare_vars(&mut script, rule, query);
    script.push('\n');
    data_pipeline(&mut script, rule, query);
    script.push('\n');
    trigger_pipeline(&mut script, rule);
    let _ = write!(script, "\ntrigger\n    |httpOut('{HTTP_ENDPOINT}')\n");
    script
}

/// Quotes a TICKscript string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Quotes a field or tag reference inside a lambda.
pub fn reference(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

/// True for duration literals such as `10s`, `1m` or `1h30m`.
pub fn is_duration(value: &str) -> bool {
    const UNITS: [&str; 8] = ["ms", "u", "µ", "s", "m", "h", "d", "w"];
    let mut rest = value;
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        match UNITS.iter().find(|unit| rest.starts_with(*unit)) {
            Some(unit) => rest = &rest[unit.len()..],
            None => return false,
        }
    }
    true
}

/// True for names usable as a TICKscript method or function.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn retention_policy(query: &QueryConfig) -> &str {
    if query.retention_policy.is_empty() {
        DEFAULT_RP
    } else {
        &query.retention_policy
    }
}

fn declare_vars(out: &mut String, rule: &AlertRule, query: &QueryConfig) {
    let group_tags: Vec<String> = query
        .group_by
        .tags
        .iter()
        .flatten()
        .map(|t| quote(t))
        .collect();

    let _ = writeln!(out, "var db = {}", quote(&query.database));
    let _ = writeln!(out, "var rp = {}", quote(retention_policy(query)));
    let _ = writeln!(out, "var measurement = {}", quote(&query.measurement));
    let _ = writeln!(out, "var groupBy = [{}]", group_tags.join(", "));
    let _ = writeln!(out, "var whereFilter = lambda: {}", where_filter(query));
    if !rule.every.is_empty() {
        let period = if query.group_by.time.is_empty() {
            &rule.every
        } else {
            &query.group_by.time
        };
        let _ = writeln!(out, "var period = {period}");
        let _ = writeln!(out, "var every = {}", rule.every);
    }
    let _ = writeln!(out, "var name = {}", quote(&rule.name));
    let _ = writeln!(out, "var idVar = name + ':{{{{.Group}}}}'");
    let _ = writeln!(out, "var message = {}", quote(&rule.message));
    let _ = writeln!(out, "var details = {}", quote(&rule.details));
    let _ = writeln!(out, "var idTag = 'alertID'");
    let _ = writeln!(out, "var levelTag = 'level'");
    let _ = writeln!(out, "var messageField = 'message'");
    let _ = writeln!(out, "var durationField = 'duration'");
    let _ = writeln!(out, "var triggerType = {}", quote(&rule.trigger));
    let values = &rule.trigger_values;
    match rule.trigger.as_str() {
        "deadman" => {
            let period: &str = if values.period.is_empty() { "10m" } else { &values.period };
            let _ = writeln!(out, "var threshold = 0.0");
            let _ = writeln!(out, "var deadmanPeriod = {period}");
        }
        _ => {
            let _ = writeln!(out, "var crit = {}", number(&values.value));
            if is_range(&values.operator) {
                let _ = writeln!(out, "var lower = {}", number(&values.value));
                let _ = writeln!(out, "var upper = {}", number(&values.range_value));
            }
            if rule.trigger == "relative" {
                let shift: &str = if values.shift.is_empty() { "1m" } else { &values.shift };
                let _ = writeln!(out, "var shift = {shift}");
            }
        }
    }
    let _ = writeln!(out, "var {RULE_VAR} = ''");
}

fn where_filter(query: &QueryConfig) -> String {
    let Some(tags) = query.tags.as_ref().filter(|t| !t.is_empty()) else {
        return "TRUE".into();
    };
    let clauses: Vec<String> = tags
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(key, values)| {
            let (op, join) = if query.are_tags_accepted {
                ("==", " OR ")
            } else {
                ("!=", " AND ")
            };
            let parts: Vec<String> = values
                .iter()
                .map(|v| format!("{} {op} {}", reference(key), quote(v)))
                .collect();
            format!("({})", parts.join(join))
        })
        .collect();
    if clauses.is_empty() {
        "TRUE".into()
    } else {
        clauses.join(" AND ")
    }
}

fn data_pipeline(out: &mut String, rule: &AlertRule, query: &QueryConfig) {
    out.push_str("var data = stream\n");
    out.push_str("    |from()\n");
    out.push_str("        .database(db)\n");
    out.push_str("        .retentionPolicy(rp)\n");
    out.push_str("        .measurement(measurement)\n");
    out.push_str("        .groupBy(groupBy)\n");
    out.push_str("        .where(whereFilter)\n");

    let first = query.fields.iter().flatten().next();
    let func = first.and_then(|f| f.funcs.iter().flatten().next());
    match (first, func) {
        (Some(field), Some(func)) if !rule.every.is_empty() => {
            out.push_str("    |window()\n");
            out.push_str("        .period(period)\n");
            out.push_str("        .every(every)\n");
            out.push_str("        .align()\n");
            let _ = writeln!(out, "    |{func}({})", quote(&field.field));
            out.push_str("        .as('value')\n");
        }
        (Some(field), _) => {
            let _ = writeln!(out, "    |eval(lambda: {})", reference(&field.field));
            out.push_str("        .as('value')\n");
        }
        (None, _) => {}
    }
}

fn trigger_pipeline(out: &mut String, rule: &AlertRule) {
    let source = match rule.trigger.as_str() {
        "deadman" => {
            out.push_str("var trigger = data\n");
            out.push_str("    |deadman(threshold, deadmanPeriod)\n");
            alert_properties(out, rule);
            return;
        }
        "relative" => {
            out.push_str("var past = data\n");
            out.push_str("    |shift(shift)\n\n");
            out.push_str("var current = data\n\n");
            out.push_str("var relative = past\n");
            out.push_str("    |join(current)\n");
            out.push_str("        .as('past', 'current')\n");
            let expr = if rule.trigger_values.change == "% change" {
                "abs(float(\"current.value\" - \"past.value\")) / float(\"past.value\") * 100.0"
            } else {
                "float(\"current.value\" - \"past.value\")"
            };
            let _ = writeln!(out, "    |eval(lambda: {expr})");
            out.push_str("        .keep()\n");
            out.push_str("        .as('value')\n\n");
            "relative"
        }
        _ => "data",
    };
    let _ = writeln!(out, "var trigger = {source}");
    out.push_str("    |alert()\n");
    let _ = writeln!(out, "        .crit(lambda: {})", condition(&rule.trigger_values.operator));
    alert_properties(out, rule);
}

fn alert_properties(out: &mut String, rule: &AlertRule) {
    out.push_str("        .stateChangesOnly()\n");
    out.push_str("        .message(message)\n");
    out.push_str("        .details(details)\n");
    out.push_str("        .id(idVar)\n");
    out.push_str("        .idTag(idTag)\n");
    out.push_str("        .levelTag(levelTag)\n");
    out.push_str("        .messageField(messageField)\n");
    out.push_str("        .durationField(durationField)\n");
    for node in handler_nodes(rule) {
        let _ = writeln!(out, "        .{}({})", node.name, args(&node.args));
        for prop in node.properties.iter().flatten() {
            let _ = writeln!(out, "            .{}({})", prop.name, args(&prop.args));
        }
    }
}

fn handler_nodes(rule: &AlertRule) -> Vec<KapacitorNode> {
    match rule.alert_nodes.as_ref().filter(|n| !n.is_empty()) {
        Some(nodes) => nodes.clone(),
        None => rule
            .alerts
            .iter()
            .flatten()
            .map(|name| KapacitorNode {
                name: name.clone(),
                ..Default::default()
            })
            .collect(),
    }
}

fn args(args: &Option<Vec<String>>) -> String {
    args.iter()
        .flatten()
        .map(|a| quote(a))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_range(operator: &str) -> bool {
    matches!(operator, "inside range" | "outside range")
}

fn condition(operator: &str) -> String {
    let op = match operator {
        "inside range" => return "\"value\" >= lower AND \"value\" <= upper".into(),
        "outside range" => return "\"value\" < lower OR \"value\" > upper".into(),
        "less than" => "<",
        "equal to or greater" => ">=",
        "equal to or less than" => "<=",
        "equal to" => "==",
        "not equal to" => "!=",
        _ => ">",
    };
    format!("\"value\" {op} crit")
}

/// Numeric literals pass through; anything else becomes a string literal.
fn number(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        quote(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Field, GroupBy, TriggerValues};
    use std::collections::BTreeMap;

    fn threshold_rule(funcs: Vec<&str>, every: &str) -> AlertRule {
        AlertRule {
            name: "cpu high".into(),
            every: every.into(),
            trigger: "threshold".into(),
            trigger_values: TriggerValues {
                operator: "greater than".into(),
                value: "90".into(),
                ..Default::default()
            },
            query: Some(QueryConfig {
                database: "telegraf".into(),
                measurement: "cpu".into(),
                fields: Some(vec![Field {
                    field: "usage_user".into(),
                    funcs: Some(funcs.into_iter().map(String::from).collect()),
                }]),
                group_by: GroupBy {
                    time: String::new(),
                    tags: Some(vec!["host".into()]),
                },
                ..Default::default()
            }),
            alerts: Some(vec!["slack".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn aggregating_rule_is_windowed() {
        let script = generate(&threshold_rule(vec!["mean"], "1m"));
        assert!(script.contains("var every = 1m"));
        assert!(script.contains("|window()"));
        assert!(script.contains("|mean('usage_user')"));
        assert!(script.contains(".crit(lambda: \"value\" > crit)"));
        assert!(script.contains("var rp = 'autogen'"));
        assert!(script.contains("var groupBy = ['host']"));
        assert!(script.contains(".slack()"));
        assert!(script.trim_end().ends_with("|httpOut('output')"));
    }

    #[test]
    fn field_references_are_escaped() {
        let mut rule = threshold_rule(vec![], "");
        rule.query.as_mut().unwrap().fields.as_mut().unwrap()[0].field = r#"usage"user"#.into();
        let script = generate(&rule);
        assert!(script.contains(r#"|eval(lambda: "usage\"user")"#));
    }

    #[test]
    fn duration_literals() {
        for ok in ["10s", "1m", "1h30m", "500ms", "2w"] {
            assert!(is_duration(ok), "{ok}");
        }
        for bad in ["", "m", "10", "1 m", "1m)|httpOut('x')", "1y"] {
            assert!(!is_duration(bad), "{bad}");
        }
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("mean"));
        assert!(is_identifier("slack_v2"));
        assert!(!is_identifier("mean()|log"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn raw_field_is_not_windowed() {
        let script = generate(&threshold_rule(vec![], ""));
        assert!(!script.contains("|window()"));
        assert!(script.contains("|eval(lambda: \"usage_user\")"));
    }

    #[test]
    fn tag_filter_respects_acceptance() {
        let mut rule = threshold_rule(vec![], "");
        let query = rule.query.as_mut().unwrap();
        query.tags = Some(BTreeMap::from([(
            "host".to_string(),
            vec!["a".to_string(), "b".to_string()],
        )]));
        query.are_tags_accepted = true;
        assert!(generate(&rule).contains("(\"host\" == 'a' OR \"host\" == 'b')"));

        rule.query.as_mut().unwrap().are_tags_accepted = false;
        assert!(generate(&rule).contains("(\"host\" != 'a' AND \"host\" != 'b')"));
    }

    #[test]
    fn range_and_relative_triggers() {
        let mut rule = threshold_rule(vec![], "");
        rule.trigger = "relative".into();
        rule.trigger_values.operator = "outside range".into();
        rule.trigger_values.range_value = "100".into();
        rule.trigger_values.change = "% change".into();
        let script = generate(&rule);
        assert!(script.contains("var upper = 100"));
        assert!(script.contains("|shift(shift)"));
        assert!(script.contains("var trigger = relative"));
        assert!(script.contains("\"value\" < lower OR \"value\" > upper"));
    }

    #[test]
    fn deadman_uses_period() {
        let mut rule = threshold_rule(vec![], "");
        rule.trigger = "deadman".into();
        rule.trigger_values.period = "5m".into();
        let script = generate(&rule);
        assert!(script.contains("var deadmanPeriod = 5m"));
        assert!(script.contains("|deadman(threshold, deadmanPeriod)"));
        assert!(!script.contains(".crit("));
    }

    #[test]
    fn alert_nodes_take_precedence_with_quoted_args() {
        let mut rule = threshold_rule(vec![], "");
        rule.alert_nodes = Some(vec![KapacitorNode {
            name: "email".into(),
            args: Some(vec!["ops@example.com".into()]),
            properties: Some(vec![crate::rules::KapacitorProperty {
                name: "subject".into(),
                args: Some(vec!["it's down".into()]),
            }]),
        }]);
        let script = generate(&rule);
        assert!(script.contains(".email('ops@example.com')"));
        assert!(script.contains(".subject('it\\'s down')"));
        assert!(!script.contains(".slack()"));
    }
}
