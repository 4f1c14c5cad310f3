//! Task domain model: status/workflow-step state machine, and the three
//! task kinds (Epic, PBI, SBI) built on a common `TaskHeader`.

mod epic;
mod pbi;
mod sbi;
mod status;
mod task;

pub use epic::{Epic, EpicMetadata};
pub use pbi::{Pbi, PbiMetadata};
pub use sbi::{ExecutionState, Sbi, SbiMetadata};
pub use status::{new_task_id, Status, TaskId, TaskType, WorkflowStep};
pub use task::{TaskCore, TaskHeader};

/// Polymorphic view over a persisted task, used by the unified `TaskRepository`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "taskType")]
pub enum Task {
    Epic(Epic),
    Pbi(Pbi),
    Sbi(Sbi),
}

impl Task {
    pub fn as_core(&self) -> &dyn TaskCore {
        match self {
            Task::Epic(e) => e,
            Task::Pbi(p) => p,
            Task::Sbi(s) => s,
        }
    }
}

impl TaskCore for Task {
    fn id(&self) -> &TaskId {
        self.as_core().id()
    }
    fn task_type(&self) -> TaskType {
        self.as_core().task_type()
    }
    fn title(&self) -> &str {
        self.as_core().title()
    }
    fn description(&self) -> &str {
        self.as_core().description()
    }
    fn status(&self) -> Status {
        self.as_core().status()
    }
    fn current_step(&self) -> WorkflowStep {
        self.as_core().current_step()
    }
    fn parent_task_id(&self) -> Option<&TaskId> {
        self.as_core().parent_task_id()
    }
    fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.as_core().created_at()
    }
    fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.as_core().updated_at()
    }
    fn can_delete(&self) -> bool {
        self.as_core().can_delete()
    }
}
