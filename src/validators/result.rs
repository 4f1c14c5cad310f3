//! Shared validator result shape: `{version, generatedAt, files, summary}`,
//! with `summary.files = summary.ok + summary.warn + summary.error` always
//! holding by construction, never just by convention.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { issue_type: IssueType::Ok, field: None, message: message.into() }
    }
    pub fn warn(field: Option<&str>, message: impl Into<String>) -> Self {
        Self { issue_type: IssueType::Warn, field: field.map(str::to_string), message: message.into() }
    }
    pub fn error(field: Option<&str>, message: impl Into<String>) -> Self {
        Self { issue_type: IssueType::Error, field: field.map(str::to_string), message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub issues: Vec<Issue>,
}

impl FileReport {
    /// A file's worst issue decides which summary bucket it falls into:
    /// any error wins over any warn, which wins over all-ok.
    fn worst(&self) -> IssueType {
        if self.issues.iter().any(|i| i.issue_type == IssueType::Error) {
            IssueType::Error
        } else if self.issues.iter().any(|i| i.issue_type == IssueType::Warn) {
            IssueType::Warn
        } else {
            IssueType::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Summary {
    pub files: usize,
    pub ok: usize,
    pub warn: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub version: u32,
    pub generated_at: String,
    pub files: Vec<FileReport>,
    pub summary: Summary,
}

impl ValidationResult {
    pub fn new(files: Vec<FileReport>) -> Self {
        let mut summary = Summary { files: files.len(), ..Default::default() };
        for file in &files {
            match file.worst() {
                IssueType::Ok => summary.ok += 1,
                IssueType::Warn => summary.warn += 1,
                IssueType::Error => summary.error += 1,
            }
        }
        Self {
            version: 1,
            generated_at: crate::time::to_rfc3339_nanos(crate::time::now()),
            files,
            summary,
        }
    }
}
