//! Integrated "doctor" report: state + health + journal validators composed
//! into one aggregate, each component contributing to exactly one of
//! `ok`/`warn`/`error` by its worst issue.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::result::{FileReport, Issue, IssueType};
use super::{health_validator, journal_validator, state_validator};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub version: u32,
    pub generated_at: String,
    pub components: Vec<FileReport>,
    pub ok: usize,
    pub warn: usize,
    pub error: usize,
}

fn worst(issues: &[Issue]) -> IssueType {
    if issues.iter().any(|i| i.issue_type == IssueType::Error) {
        IssueType::Error
    } else if issues.iter().any(|i| i.issue_type == IssueType::Warn) {
        IssueType::Warn
    } else {
        IssueType::Ok
    }
}

/// Run all three file validators against the workspace layout rooted at
/// `<root>/var/{state,health}.json` and `<root>/var/journal.ndjson`.
pub async fn run(state_path: &Path, health_path: &Path, journal_path: &Path) -> Result<DoctorReport> {
    let components = vec![
        state_validator::validate_file(state_path).await?,
        health_validator::validate_file(health_path).await?,
        journal_validator::validate_file(journal_path).await?,
    ];

    let mut report = DoctorReport {
        version: 1,
        generated_at: crate::time::to_rfc3339_nanos(crate::time::now()),
        components,
        ok: 0,
        warn: 0,
        error: 0,
    };
    for component in &report.components {
        match worst(&component.issues) {
            IssueType::Ok => report.ok += 1,
            IssueType::Warn => report.warn += 1,
            IssueType::Error => report.error += 1,
        }
    }
    Ok(report)
}
