mod model;
mod translate;
mod validate;

pub use model::{
    AlertRule, Field, GroupBy, KapacitorNode, KapacitorProperty, QueryConfig, TaskStatus,
    TriggerValues,
};
pub use translate::{alert_response, to_remote, AlertLinks, AlertResponse, AlertRulesResponse, Normalize};
pub use validate::{validate_rule, validate_status};
