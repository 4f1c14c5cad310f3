//! Lifecycle status and workflow step enumerations, and the legal
//! transition table shared by Epic, PBI and SBI.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque task identifier. Globally unique, never empty.
pub type TaskId = String;

/// Generate a fresh task id.
pub fn new_task_id() -> TaskId {
    uuid::Uuid::new_v4().to_string()
}

/// Task kind discriminant, used by repositories to dispatch polymorphically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Epic,
    Pbi,
    Sbi,
}

/// Lifecycle status, shared across Epic/PBI/SBI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Picked,
    Implementing,
    Reviewing,
    Done,
    Failed,
}

impl Status {
    /// `true` for DONE/FAILED — no further transition is legal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Failed)
    }

    /// Validate `self -> next` against the directed transition graph:
    ///
    /// ```text
    /// PENDING -> PICKED -> IMPLEMENTING -> REVIEWING -> { DONE | IMPLEMENTING (rework) | FAILED }
    /// IMPLEMENTING -> FAILED
    /// ```
    ///
    /// Any edge not listed above is an `InvalidTransition` error, including
    /// self-transitions and transitions out of a terminal status.
    pub fn validate_transition(self, next: Status) -> Result<(), EngineError> {
        use Status::*;
        let legal = matches!(
            (self, next),
            (Pending, Picked)
                | (Picked, Implementing)
                | (Implementing, Reviewing)
                | (Implementing, Failed)
                | (Reviewing, Done)
                | (Reviewing, Implementing)
                | (Reviewing, Failed)
        );
        if legal {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// The workflow step that lockstep-tracks this status.
    ///
    /// PENDING has no dedicated step in the spec's enumeration; it is
    /// treated as pre-`pick` and reported as `Pick` (the step the task is
    /// about to enter).
    pub fn workflow_step(self) -> WorkflowStep {
        match self {
            Status::Pending | Status::Picked => WorkflowStep::Pick,
            Status::Implementing => WorkflowStep::Implement,
            Status::Reviewing => WorkflowStep::Review,
            Status::Done | Status::Failed => WorkflowStep::Done,
        }
    }
}

/// Workflow step, advances in lockstep with `Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    Pick,
    Implement,
    Review,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        assert!(Status::Pending.validate_transition(Status::Picked).is_ok());
        assert!(Status::Picked
            .validate_transition(Status::Implementing)
            .is_ok());
        assert!(Status::Implementing
            .validate_transition(Status::Reviewing)
            .is_ok());
        assert!(Status::Reviewing.validate_transition(Status::Done).is_ok());
    }

    #[test]
    fn rework_loop_is_legal() {
        assert!(Status::Reviewing
            .validate_transition(Status::Implementing)
            .is_ok());
    }

    #[test]
    fn failure_paths_are_legal() {
        assert!(Status::Implementing
            .validate_transition(Status::Failed)
            .is_ok());
        assert!(Status::Reviewing
            .validate_transition(Status::Failed)
            .is_ok());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        assert!(Status::Done.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(Status::Done.validate_transition(Status::Picked).is_err());
        assert!(Status::Failed
            .validate_transition(Status::Implementing)
            .is_err());
    }

    #[test]
    fn skipping_a_stage_is_illegal() {
        assert!(Status::Pending
            .validate_transition(Status::Implementing)
            .is_err());
    }

    #[test]
    fn step_lockstep() {
        assert_eq!(Status::Picked.workflow_step(), WorkflowStep::Pick);
        assert_eq!(Status::Implementing.workflow_step(), WorkflowStep::Implement);
        assert_eq!(Status::Reviewing.workflow_step(), WorkflowStep::Review);
        assert_eq!(Status::Done.workflow_step(), WorkflowStep::Done);
        assert_eq!(Status::Failed.workflow_step(), WorkflowStep::Done);
    }
}
