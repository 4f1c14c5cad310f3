//! Specification Backlog Item — the leaf task kind the turn engine drives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Status, TaskId, TaskType, WorkflowStep};
use super::task::{TaskCore, TaskHeader};
use crate::error::Result;
use crate::time::now;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SbiMetadata {
    pub estimated_hours: f64,
    pub priority: i32,
    pub labels: Vec<String>,
    pub assigned_agent: String,
    pub file_paths: Vec<String>,
}

/// Per-SBI execution bookkeeping the turn engine mutates every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub current_turn: u32,
    pub current_attempt: u32,
    pub last_error: String,
    pub artifact_paths: Vec<String>,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            current_turn: 0,
            current_attempt: 1,
            last_error: String::new(),
            artifact_paths: Vec::new(),
        }
    }
}

impl ExecutionState {
    /// Advance to the next turn, resetting the attempt counter to 1.
    pub fn increment_turn(&mut self) {
        self.current_turn += 1;
        self.current_attempt = 1;
    }

    /// Record a retry within the current turn. Never touches `current_turn`.
    pub fn increment_attempt(&mut self) {
        self.current_attempt += 1;
    }

    /// Store the last error verbatim (overwrites any previous value).
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = error.into();
    }

    pub fn add_artifact(&mut self, path: impl Into<String>) {
        self.artifact_paths.push(path.into());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sbi {
    #[serde(flatten)]
    pub header: TaskHeader,
    pub parent_pbi_id: Option<TaskId>,
    pub metadata: SbiMetadata,
    pub execution_state: ExecutionState,
    /// Monotone across the repository; assigned by `SbiRepository::get_next_sequence`.
    pub sequence: u64,
    pub registered_at: DateTime<Utc>,
}

impl Sbi {
    pub fn new(title: String, description: String, parent_pbi_id: Option<TaskId>, sequence: u64) -> Result<Self> {
        let mut header = TaskHeader::new(TaskType::Sbi, title, description)?;
        header.parent_id = parent_pbi_id.clone();
        Ok(Self {
            header,
            parent_pbi_id,
            metadata: SbiMetadata::default(),
            execution_state: ExecutionState::default(),
            sequence,
            registered_at: now(),
        })
    }

    pub fn update_title(&mut self, title: String) -> Result<()> {
        self.header.update_title(title)
    }

    pub fn update_description(&mut self, description: String) {
        self.header.update_description(description)
    }

    pub fn update_status(&mut self, next: Status) -> Result<()> {
        self.header.update_status(next)
    }

    pub fn update_metadata(&mut self, metadata: SbiMetadata) {
        self.metadata = metadata;
        self.header.updated_at = now();
    }

    pub fn increment_turn(&mut self) {
        self.execution_state.increment_turn();
        self.header.updated_at = now();
    }

    pub fn increment_attempt(&mut self) {
        self.execution_state.increment_attempt();
        self.header.updated_at = now();
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.execution_state.record_error(error);
        self.header.updated_at = now();
    }

    pub fn add_artifact(&mut self, path: impl Into<String>) {
        self.execution_state.add_artifact(path);
        self.header.updated_at = now();
    }
}

impl TaskCore for Sbi {
    fn id(&self) -> &TaskId {
        &self.header.id
    }
    fn task_type(&self) -> TaskType {
        TaskType::Sbi
    }
    fn title(&self) -> &str {
        &self.header.title
    }
    fn description(&self) -> &str {
        &self.header.description
    }
    fn status(&self) -> Status {
        self.header.status
    }
    fn current_step(&self) -> WorkflowStep {
        self.header.current_step
    }
    fn parent_task_id(&self) -> Option<&TaskId> {
        self.parent_pbi_id.as_ref()
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.header.updated_at
    }
    fn can_delete(&self) -> bool {
        self.header.status != Status::Implementing
    }
}
