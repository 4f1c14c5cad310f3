//! Epic — the coarsest task kind. Owns an ordered, de-duplicated list of
//! child PBI ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Status, TaskId, TaskType, WorkflowStep};
use super::task::{TaskCore, TaskHeader};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EpicMetadata {
    pub estimated_story_points: u32,
    pub priority: i32,
    pub labels: Vec<String>,
    pub assigned_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    #[serde(flatten)]
    pub header: TaskHeader,
    pub pbi_ids: Vec<TaskId>,
    pub metadata: EpicMetadata,
}

impl Epic {
    pub fn new(title: String, description: String) -> Result<Self> {
        Ok(Self {
            header: TaskHeader::new(TaskType::Epic, title, description)?,
            pbi_ids: Vec::new(),
            metadata: EpicMetadata::default(),
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

    pub fn update_metadata(&mut self, metadata: EpicMetadata) {
        self.metadata = metadata;
        self.header.updated_at = crate::time::now();
    }

    /// Append a PBI id. Rejects duplicates.
    pub fn add_pbi(&mut self, pbi_id: TaskId) -> Result<()> {
        if self.pbi_ids.contains(&pbi_id) {
            return Err(EngineError::InvariantViolation(format!(
                "pbi {pbi_id} already attached to epic {}",
                self.header.id
            )));
        }
        self.pbi_ids.push(pbi_id);
        self.header.updated_at = crate::time::now();
        Ok(())
    }

    /// Remove a PBI id. Errors if the id is not present.
    pub fn remove_pbi(&mut self, pbi_id: &TaskId) -> Result<()> {
        let before = self.pbi_ids.len();
        self.pbi_ids.retain(|id| id != pbi_id);
        if self.pbi_ids.len() == before {
            return Err(EngineError::NotFound(format!(
                "pbi {pbi_id} not attached to epic {}",
                self.header.id
            )));
        }
        self.header.updated_at = crate::time::now();
        Ok(())
    }
}

impl TaskCore for Epic {
    fn id(&self) -> &TaskId {
        &self.header.id
    }
    fn task_type(&self) -> TaskType {
        TaskType::Epic
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
        None
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.header.updated_at
    }
    fn can_delete(&self) -> bool {
        self.pbi_ids.is_empty()
    }
}
