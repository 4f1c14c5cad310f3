//! `var/state.json` validator: required `{version=1, step, turn, meta.updated_at}`,
//! forbidden legacy `current` key.

use std::path::Path;

use serde_json::Value;

use super::result::{FileReport, Issue};
use crate::domain::WorkflowStep;
use crate::error::Result;

pub const STATE_FILE_NAME: &str = "state.json";

pub fn validate_value(value: &Value) -> Vec<Issue> {
    let mut issues = Vec::new();
    let Some(obj) = value.as_object() else {
        issues.push(Issue::error(None, "state.json is not a JSON object"));
        return issues;
    };

    if obj.contains_key("current") {
        issues.push(Issue::error(
            Some("current"),
            "forbidden legacy key 'current' present",
        ));
    }

    match obj.get("version") {
        Some(Value::Number(n)) if n.as_i64() == Some(1) => {
            issues.push(Issue::ok("version is 1"));
        }
        Some(other) => issues.push(Issue::error(Some("version"), format!("version must be 1, got {other}"))),
        None => issues.push(Issue::error(Some("version"), "missing required key 'version'")),
    }

    match obj.get("step") {
        Some(step_value) => match serde_json::from_value::<WorkflowStep>(step_value.clone()) {
            Ok(_) => issues.push(Issue::ok("step is valid")),
            Err(_) => issues.push(Issue::error(Some("step"), format!("invalid step {step_value}"))),
        },
        None => issues.push(Issue::error(Some("step"), "missing required key 'step'")),
    }

    match obj.get("turn") {
        Some(Value::Number(n)) if n.as_i64().is_some_and(|t| t >= 0) => {
            issues.push(Issue::ok("turn is non-negative"));
        }
        Some(other) => issues.push(Issue::error(Some("turn"), format!("turn must be an integer >= 0, got {other}"))),
        None => issues.push(Issue::error(Some("turn"), "missing required key 'turn'")),
    }

    match obj.get("meta").and_then(|m| m.get("updated_at")).and_then(Value::as_str) {
        Some(ts) => match crate::time::parse_rfc3339_nanos(ts) {
            Ok(_) => issues.push(Issue::ok("meta.updated_at is RFC3339Nano UTC-Z")),
            Err(e) => issues.push(Issue::error(Some("meta.updated_at"), e.to_string())),
        },
        None => issues.push(Issue::error(Some("meta.updated_at"), "missing required key 'meta.updated_at'")),
    }

    issues
}

pub async fn validate_file(path: &Path) -> Result<FileReport> {
    let issues = match tokio::fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str::<Value>(&contents) {
            Ok(value) => validate_value(&value),
            Err(e) => vec![Issue::error(None, format!("malformed JSON: {e}"))],
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            vec![Issue::error(None, "state.json not found")]
        }
        Err(e) => return Err(e.into()),
    };
    Ok(FileReport {
        file: STATE_FILE_NAME.to_string(),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_state_has_no_errors() {
        let value = json!({
            "version": 1,
            "step": "implement",
            "turn": 3,
            "meta": {"updated_at": "2024-01-01T00:00:00.000000000Z"}
        });
        let issues = validate_value(&value);
        assert!(issues.iter().all(|i| i.issue_type != super::super::result::IssueType::Error));
    }

    #[test]
    fn forbidden_current_key_is_an_error() {
        let value = json!({
            "version": 1,
            "step": "implement",
            "turn": 0,
            "current": "stale",
            "meta": {"updated_at": "2024-01-01T00:00:00.000000000Z"}
        });
        let issues = validate_value(&value);
        assert!(issues
            .iter()
            .any(|i| i.field.as_deref() == Some("current") && i.issue_type == super::super::result::IssueType::Error));
    }

    #[test]
    fn missing_meta_updated_at_is_an_error() {
        let value = json!({"version": 1, "step": "implement", "turn": 0});
        let issues = validate_value(&value);
        assert!(issues
            .iter()
            .any(|i| i.field.as_deref() == Some("meta.updated_at")));
    }
}
