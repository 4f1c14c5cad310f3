//! Product Backlog Item — sits between Epic and SBI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Status, TaskId, TaskType, WorkflowStep};
use super::task::{TaskCore, TaskHeader};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PbiMetadata {
    pub story_points: u32,
    pub priority: i32,
    pub labels: Vec<String>,
    pub assigned_agent: String,
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pbi {
    #[serde(flatten)]
    pub header: TaskHeader,
    pub parent_epic_id: Option<TaskId>,
    pub sbi_ids: Vec<TaskId>,
    pub metadata: PbiMetadata,
}

impl Pbi {
    pub fn new(title: String, description: String, parent_epic_id: Option<TaskId>) -> Result<Self> {
        let mut header = TaskHeader::new(TaskType::Pbi, title, description)?;
        header.parent_id = parent_epic_id.clone();
        Ok(Self {
            header,
            parent_epic_id,
            sbi_ids: Vec::new(),
            metadata: PbiMetadata::default(),
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

    pub fn update_metadata(&mut self, metadata: PbiMetadata) {
        self.metadata = metadata;
        self.header.updated_at = crate::time::now();
    }

    pub fn add_sbi(&mut self, sbi_id: TaskId) -> Result<()> {
        if self.sbi_ids.contains(&sbi_id) {
            return Err(EngineError::InvariantViolation(format!(
                "sbi {sbi_id} already attached to pbi {}",
                self.header.id
            )));
        }
        self.sbi_ids.push(sbi_id);
        self.header.updated_at = crate::time::now();
        Ok(())
    }

    pub fn remove_sbi(&mut self, sbi_id: &TaskId) -> Result<()> {
        let before = self.sbi_ids.len();
        self.sbi_ids.retain(|id| id != sbi_id);
        if self.sbi_ids.len() == before {
            return Err(EngineError::NotFound(format!(
                "sbi {sbi_id} not attached to pbi {}",
                self.header.id
            )));
        }
        self.header.updated_at = crate::time::now();
        Ok(())
    }
}

impl TaskCore for Pbi {
    fn id(&self) -> &TaskId {
        &self.header.id
    }
    fn task_type(&self) -> TaskType {
        TaskType::Pbi
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
        self.parent_epic_id.as_ref()
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.header.updated_at
    }
    fn can_delete(&self) -> bool {
        self.sbi_ids.is_empty()
    }
}
