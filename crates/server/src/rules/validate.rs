use super::model::{AlertRule, TaskStatus};
use crate::error::ApiError;
use crate::kapacitor::ticker::{is_duration, is_identifier};

fn invalid(msg: String) -> ApiError {
    ApiError::InvalidRule(format!("invalid alert rule: {msg}"))
}

fn check_duration(name: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() || is_duration(value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} is not a duration: {value:?}")))
    }
}

fn check_identifier(kind: &str, value: &str) -> Result<(), ApiError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(invalid(format!("unknown {kind} {value:?}")))
    }
}

/// Checks that a rule can be compiled into a bounded task.
pub fn validate_rule(rule: &AlertRule) -> Result<(), ApiError> {
    let query = rule
        .query
        .as_ref()
        .ok_or_else(|| invalid("no query defined".into()))?;
    // Aggregations are evaluated over a window sampled every `every`.
    if rule.every.is_empty() && query.has_funcs() {
        return Err(invalid(r#"functions require an "every" window"#.into()));
    }

    check_duration("every", &rule.every)?;
    check_duration("groupBy.time", &query.group_by.time)?;
    check_duration("values.period", &rule.trigger_values.period)?;
    check_duration("values.shift", &rule.trigger_values.shift)?;

    for func in query.fields.iter().flatten().flat_map(|f| f.funcs.iter().flatten()) {
        check_identifier("function", func)?;
    }
    for handler in rule.alerts.iter().flatten() {
        check_identifier("alert handler", handler)?;
    }
    for node in rule.alert_nodes.iter().flatten() {
        check_identifier("alert handler", &node.name)?;
        for prop in node.properties.iter().flatten() {
            check_identifier("handler property", &prop.name)?;
        }
    }
    Ok(())
}

pub fn validate_status(status: &str) -> Result<TaskStatus, ApiError> {
    status.parse::<TaskStatus>().map_err(ApiError::InvalidStatus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Field, KapacitorNode, KapacitorProperty, QueryConfig};

    fn rule(every: &str, funcs: &[&str]) -> AlertRule {
        AlertRule {
            every: every.into(),
            query: Some(QueryConfig {
                fields: Some(vec![
                    Field {
                        field: "usage_idle".into(),
                        funcs: Some(vec![]),
                    },
                    Field {
                        field: "usage_user".into(),
                        funcs: Some(funcs.iter().map(|f| f.to_string()).collect()),
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn missing_query_rejected() {
        let err = validate_rule(&AlertRule::default()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRule(_)));
        assert!(err.to_string().contains("no query"));
    }

    #[test]
    fn funcs_without_window_rejected() {
        let err = validate_rule(&rule("", &["mean"])).unwrap_err();
        assert!(err.to_string().contains("window"));
    }

    #[test]
    fn funcs_with_window_accepted() {
        assert!(validate_rule(&rule("1m", &["mean"])).is_ok());
    }

    #[test]
    fn empty_funcs_accepted_regardless_of_window() {
        assert!(validate_rule(&rule("", &[])).is_ok());
        assert!(validate_rule(&rule("5m", &[])).is_ok());
    }

    #[test]
    fn absent_fields_accepted() {
        let r = AlertRule {
            query: Some(QueryConfig::default()),
            ..Default::default()
        };
        assert!(validate_rule(&r).is_ok());
    }

    #[test]
    fn malformed_durations_rejected() {
        let err = validate_rule(&rule("1m)|httpOut('x')", &["mean"])).unwrap_err();
        assert!(err.to_string().contains("every is not a duration"));

        let mut r = rule("1m", &[]);
        r.query.as_mut().unwrap().group_by.time = "soon".into();
        assert!(matches!(validate_rule(&r), Err(ApiError::InvalidRule(_))));

        let mut r = rule("1m", &[]);
        r.trigger_values.shift = "1 hour".into();
        assert!(validate_rule(&r).is_err());
    }

    #[test]
    fn script_names_must_be_identifiers() {
        assert!(validate_rule(&rule("1m", &["mean()|log"])).is_err());

        let mut r = rule("1m", &[]);
        r.alert_nodes = Some(vec![KapacitorNode {
            name: "slack".into(),
            properties: Some(vec![KapacitorProperty {
                name: "channel".into(),
                args: Some(vec!["#ops".into()]),
            }]),
            ..Default::default()
        }]);
        assert!(validate_rule(&r).is_ok());

        r.alerts = Some(vec!["email()\n|log".into()]);
        assert!(validate_rule(&r).is_err());
    }

    #[test]
    fn only_enabled_and_disabled_are_valid() {
        assert_eq!(validate_status("enabled").unwrap(), TaskStatus::Enabled);
        assert_eq!(validate_status("disabled").unwrap(), TaskStatus::Disabled);
        for bad in ["", "ENABLED", "paused", "enabled "] {
            assert!(matches!(validate_status(bad), Err(ApiError::InvalidStatus(_))));
        }
    }
}
