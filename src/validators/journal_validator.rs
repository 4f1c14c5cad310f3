//! Journal file validator: per-line schema plus turn-monotonicity as a
//! warning. A missing journal file is itself only a warning — an
//! as-yet-unstarted SBI has none, and that's ok-state, not an error.

use std::collections::HashMap;
use std::path::Path;

use super::result::{FileReport, Issue};
use crate::error::Result;
use crate::journal::JournalRecord;

pub const JOURNAL_FILE_NAME: &str = "journal.ndjson";

pub fn validate_lines(contents: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut records: Vec<JournalRecord> = Vec::new();

    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalRecord>(line) {
            Ok(record) => {
                if !record.timestamp.ends_with('Z')
                    || crate::time::parse_rfc3339_nanos(&record.timestamp).is_err()
                {
                    issues.push(Issue::error(
                        Some("timestamp"),
                        format!("line {}: timestamp not RFC3339Nano UTC-Z", lineno + 1),
                    ));
                } else if !record.artifacts_match_turn() {
                    issues.push(Issue::error(
                        Some("artifacts"),
                        format!("line {}: artifact path missing /turn{}/ marker", lineno + 1, record.turn),
                    ));
                } else {
                    issues.push(Issue::ok(format!("line {}: valid", lineno + 1)));
                }
                records.push(record);
            }
            Err(e) => issues.push(Issue::error(
                None,
                format!("line {}: schema violation: {e}", lineno + 1),
            )),
        }
    }

    let mut last_turn: HashMap<&str, u32> = HashMap::new();
    for r in &records {
        if let Some(&prev) = last_turn.get(r.sbi_id.as_str()) {
            if r.turn < prev {
                issues.push(Issue::warn(
                    Some("turn"),
                    format!(
                        "turn monotonicity violated for sbi {}: {} then {}",
                        r.sbi_id, prev, r.turn
                    ),
                ));
            }
        }
        last_turn.insert(r.sbi_id.as_str(), r.turn);
    }

    issues
}

pub async fn validate_file(path: &Path) -> Result<FileReport> {
    let issues = match tokio::fs::read_to_string(path).await {
        Ok(contents) => validate_lines(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            vec![Issue::warn(None, "journal.ndjson not found")]
        }
        Err(e) => return Err(e.into()),
    };
    Ok(FileReport {
        file: JOURNAL_FILE_NAME.to_string(),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::result::IssueType;

    fn line(sbi: &str, turn: u32) -> String {
        format!(
            r#"{{"timestamp":"2024-01-01T00:00:00.000000000Z","sbiId":"{sbi}","turn":{turn},"step":"plan","decision":"PENDING","elapsedMs":0,"error":"","artifacts":[]}}"#
        )
    }

    #[test]
    fn valid_lines_produce_no_errors() {
        let contents = format!("{}\n{}\n", line("s1", 1), line("s1", 2));
        let issues = validate_lines(&contents);
        assert!(issues.iter().all(|i| i.issue_type != IssueType::Error));
    }

    #[test]
    fn monotonicity_violation_is_a_warning_not_error() {
        let contents = format!("{}\n{}\n", line("s1", 2), line("s1", 1));
        let issues = validate_lines(&contents);
        assert!(issues.iter().any(|i| i.issue_type == IssueType::Warn));
        assert!(issues.iter().all(|i| i.issue_type != IssueType::Error));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let contents = "not json\n".to_string();
        let issues = validate_lines(&contents);
        assert!(issues.iter().any(|i| i.issue_type == IssueType::Error));
    }
}
