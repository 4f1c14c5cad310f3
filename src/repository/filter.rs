//! `List` query filter. Predicates apply in the fixed logical order the
//! spec names: type, status, step, parentId, hasParent, labels, then
//! limit/offset over whatever survives.

use std::collections::HashSet;

use crate::domain::{Status, TaskId, TaskType, WorkflowStep};

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub task_type: Option<HashSet<TaskType>>,
    pub status: Option<HashSet<Status>>,
    pub step: Option<HashSet<WorkflowStep>>,
    pub parent_id: Option<TaskId>,
    pub has_parent: Option<bool>,
    pub labels: Option<HashSet<String>>,
    /// `0` means unbounded.
    pub limit: usize,
    pub offset: usize,
}

impl TaskFilter {
    fn matches_common(
        &self,
        task_type: TaskType,
        status: Status,
        step: WorkflowStep,
        parent_id: Option<&TaskId>,
        labels: &[String],
    ) -> bool {
        if let Some(types) = &self.task_type {
            if !types.contains(&task_type) {
                return false;
            }
        }
        if let Some(statuses) = &self.status {
            if !statuses.contains(&status) {
                return false;
            }
        }
        if let Some(steps) = &self.step {
            if !steps.contains(&step) {
                return false;
            }
        }
        if let Some(wanted_parent) = &self.parent_id {
            if parent_id != Some(wanted_parent) {
                return false;
            }
        }
        if let Some(has_parent) = self.has_parent {
            if parent_id.is_some() != has_parent {
                return false;
            }
        }
        if let Some(wanted_labels) = &self.labels {
            if !wanted_labels.iter().any(|l| labels.contains(l)) {
                return false;
            }
        }
        true
    }

    /// Apply this filter's predicates (not limit/offset) to one candidate.
    pub fn matches(
        &self,
        task_type: TaskType,
        status: Status,
        step: WorkflowStep,
        parent_id: Option<&TaskId>,
        labels: &[String],
    ) -> bool {
        self.matches_common(task_type, status, step, parent_id, labels)
    }

    /// Apply limit/offset to an already-filtered, already-ordered sequence.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped: Vec<T> = items.into_iter().skip(self.offset).collect();
        if self.limit == 0 {
            skipped
        } else {
            skipped.into_iter().take(self.limit).collect()
        }
    }
}
