//! `var/health.json` validator: required `{ts, turn, step, ok, error}` plus
//! the cross-field rule that `ok` and `error` must agree.

use std::path::Path;

use serde_json::Value;

use super::result::{FileReport, Issue};
use crate::error::Result;

pub const HEALTH_FILE_NAME: &str = "health.json";

pub fn validate_value(value: &Value) -> Vec<Issue> {
    let mut issues = Vec::new();
    let Some(obj) = value.as_object() else {
        issues.push(Issue::error(None, "health.json is not a JSON object"));
        return issues;
    };

    match obj.get("ts").and_then(Value::as_str) {
        Some(ts) => match crate::time::parse_rfc3339_nanos(ts) {
            Ok(_) => issues.push(Issue::ok("ts is RFC3339Nano UTC-Z")),
            Err(e) => issues.push(Issue::error(Some("ts"), e.to_string())),
        },
        None => issues.push(Issue::error(Some("ts"), "missing required key 'ts'")),
    }

    match obj.get("turn") {
        Some(Value::Number(n)) if n.as_i64().is_some_and(|t| t >= 0) => {
            issues.push(Issue::ok("turn is non-negative"))
        }
        Some(other) => issues.push(Issue::error(Some("turn"), format!("turn must be an integer >= 0, got {other}"))),
        None => issues.push(Issue::error(Some("turn"), "missing required key 'turn'")),
    }

    if obj.get("step").is_none() {
        issues.push(Issue::error(Some("step"), "missing required key 'step'"));
    } else {
        issues.push(Issue::ok("step present"));
    }

    let ok_value = obj.get("ok").and_then(Value::as_bool);
    if ok_value.is_none() {
        issues.push(Issue::error(Some("ok"), "missing required boolean key 'ok'"));
    }

    let error_value = obj.get("error").and_then(Value::as_str);
    if error_value.is_none() {
        issues.push(Issue::error(Some("error"), "missing required string key 'error'"));
    }

    if let (Some(ok), Some(error)) = (ok_value, error_value) {
        if ok && !error.is_empty() {
            issues.push(Issue::warn(
                Some("ok"),
                "ok=true but error is non-empty",
            ));
        } else if !ok && error.is_empty() {
            issues.push(Issue::warn(
                Some("ok"),
                "ok=false but error is empty",
            ));
        } else {
            issues.push(Issue::ok("ok/error are consistent"));
        }
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
            vec![Issue::warn(None, "health.json not found")]
        }
        Err(e) => return Err(e.into()),
    };
    Ok(FileReport {
        file: HEALTH_FILE_NAME.to_string(),
        issues,
    })
}
