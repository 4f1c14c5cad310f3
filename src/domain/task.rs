//! Common task surface shared by Epic, PBI and SBI.
//!
//! Mirrors the capability-set approach `ob-workflow::state::WorkflowInstance`
//! uses for its own lifecycle (a plain struct with mutator methods), but
//! factored into a `TaskHeader` each task kind embeds, plus a `TaskCore`
//! trait so repositories can treat the three kinds polymorphically without
//! a trait-object hierarchy (see design note: avoid deep inheritance).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{new_task_id, Status, TaskId, TaskType, WorkflowStep};
use crate::error::{EngineError, Result};
use crate::time::now;

/// Fields and lifecycle mutators common to Epic, PBI and SBI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHeader {
    pub id: TaskId,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub current_step: WorkflowStep,
    pub parent_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskHeader {
    /// Construct a brand-new header in `Status::Pending`.
    pub fn new(task_type: TaskType, title: String, description: String) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(EngineError::InvariantViolation(
                "title must not be empty".into(),
            ));
        }
        let now_ts = now();
        Ok(Self {
            id: new_task_id(),
            task_type,
            title,
            description,
            status: Status::Pending,
            current_step: Status::Pending.workflow_step(),
            parent_id: None,
            created_at: now_ts,
            updated_at: now_ts,
        })
    }

    /// Rebuild a header from storage without re-validating how it got
    /// there. Used only by repositories loading persisted state — never
    /// by code constructing a task for the first time.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TaskId,
        task_type: TaskType,
        title: String,
        description: String,
        status: Status,
        current_step: WorkflowStep,
        parent_id: Option<TaskId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_type,
            title,
            description,
            status,
            current_step,
            parent_id,
            created_at,
            updated_at,
        }
    }

    pub fn update_title(&mut self, title: String) -> Result<()> {
        if title.trim().is_empty() {
            return Err(EngineError::InvariantViolation(
                "title must not be empty".into(),
            ));
        }
        self.title = title;
        self.updated_at = now();
        Ok(())
    }

    pub fn update_description(&mut self, description: String) {
        self.description = description;
        self.updated_at = now();
    }

    /// Validate and apply a status transition, advancing `current_step`
    /// in lockstep. No side effects on failure.
    pub fn update_status(&mut self, next: Status) -> Result<()> {
        self.status.validate_transition(next)?;
        self.status = next;
        self.current_step = next.workflow_step();
        self.updated_at = now();
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Done
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Uniform capability set over Epic/PBI/SBI, used by repositories that
/// need to treat the three kinds polymorphically (e.g. the unified
/// `TaskRepository`).
pub trait TaskCore {
    fn id(&self) -> &TaskId;
    fn task_type(&self) -> TaskType;
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn status(&self) -> Status;
    fn current_step(&self) -> WorkflowStep;
    fn parent_task_id(&self) -> Option<&TaskId>;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn can_delete(&self) -> bool;
}
