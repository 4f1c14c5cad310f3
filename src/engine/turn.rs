//! Turn execution engine: one `execute_turn` call drives one SBI through
//! exactly one state-machine step, the way `WorkflowEngine::advance` in
//! `ob-workflow/src/engine.rs` drives one workflow instance through one
//! transition under its own lock.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Sbi, Status, TaskCore, TaskId};
use crate::error::{EngineError, Result};
use crate::journal::{Artifact, Decision, Journal, JournalRecord, Step};
use crate::lock::LockManager;
use crate::repository::SbiRepo;
use crate::time::{now, to_rfc3339_nanos};
use crate::workspace::Workspace;

use super::agent::Agent;
use super::prompt::PromptBuilder;

/// Retries per turn before an implement failure becomes terminal.
pub const MAX_ATTEMPTS: u32 = 3;
/// Run-lock lease length. Long enough to cover one agent invocation.
pub const RUN_LOCK_TTL: Duration = Duration::from_secs(300);

/// A reviewer's `NEEDS_CHANGES` reason code, when the agent supplies one.
/// Unknown codes are treated as absent rather than rejected — the core
/// doesn't gate on these, it only records them.
const KNOWN_REASON_CODES: &[&str] = &[
    "DEP_UNRESOLVED",
    "DEP_CYCLE",
    "META_MISSING",
    "PATH_INVALID",
    "PROMPT_ERROR",
    "TIME_FORMAT",
    "JOURNAL_GUARD",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewDecision {
    Succeeded,
    NeedsChanges,
    Failed,
}

impl ReviewDecision {
    /// The black-box agent interface defines no schema for the review
    /// verdict; we take the first trimmed line of stdout as the literal
    /// decision token.
    fn parse(stdout: &str) -> Result<Self> {
        match stdout.lines().next().unwrap_or("").trim() {
            "SUCCEEDED" => Ok(ReviewDecision::Succeeded),
            "NEEDS_CHANGES" => Ok(ReviewDecision::NeedsChanges),
            "FAILED" => Ok(ReviewDecision::Failed),
            other => Err(EngineError::InvariantViolation(format!(
                "unparseable review decision: {other:?}"
            ))),
        }
    }
}

fn reason_code(stdout: &str) -> Option<&'static str> {
    let second_line = stdout.lines().nth(1)?.trim();
    KNOWN_REASON_CODES.iter().copied().find(|c| *c == second_line)
}

pub struct TurnEngine {
    locks: Arc<dyn LockManager>,
    sbis: Arc<dyn SbiRepo>,
    journal: Arc<dyn Journal>,
    prompts: Arc<dyn PromptBuilder>,
    agent: Arc<dyn Agent>,
    workspace: Arc<Workspace>,
    agent_name: String,
}

impl TurnEngine {
    pub fn new(
        locks: Arc<dyn LockManager>,
        sbis: Arc<dyn SbiRepo>,
        journal: Arc<dyn Journal>,
        prompts: Arc<dyn PromptBuilder>,
        agent: Arc<dyn Agent>,
        workspace: Arc<Workspace>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            locks,
            sbis,
            journal,
            prompts,
            agent,
            workspace,
            agent_name: agent_name.into(),
        }
    }

    /// Drive `sbi_id` through exactly one state-machine step. Acquires
    /// `run:<sbiId>`, releasing it on every return path (success or
    /// error) so a panic-free error never leaks a held lease.
    pub async fn execute_turn(&self, sbi_id: &TaskId) -> Result<Status> {
        let lock_id = format!("run:{sbi_id}");
        if self.locks.acquire_run(&lock_id, RUN_LOCK_TTL).await?.is_none() {
            return Err(EngineError::Busy(lock_id));
        }

        let result = self.execute_turn_locked(sbi_id).await;
        self.locks.release(&lock_id).await?;
        result
    }

    async fn execute_turn_locked(&self, sbi_id: &TaskId) -> Result<Status> {
        let mut sbi = self.sbis.find(sbi_id).await?;
        if sbi.status().is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: sbi.status(),
                to: sbi.status(),
            });
        }

        match sbi.status() {
            Status::Pending => self.step_pick(&mut sbi).await,
            Status::Picked | Status::Implementing => self.step_implement(&mut sbi).await,
            Status::Reviewing => self.step_review(&mut sbi).await,
            other => Err(EngineError::InvariantViolation(format!(
                "no turn step defined for status {other:?}"
            ))),
        }
    }

    async fn step_pick(&self, sbi: &mut Sbi) -> Result<Status> {
        sbi.update_status(Status::Picked)?;
        sbi.increment_turn();
        self.save_and_journal(
            sbi,
            Step::Plan,
            Decision::Pending,
            0,
            String::new(),
            vec![],
        )
        .await?;
        tracing::info!(sbi_id = %sbi.id(), turn = sbi.execution_state.current_turn, "sbi picked");
        Ok(sbi.status())
    }

    async fn step_implement(&self, sbi: &mut Sbi) -> Result<Status> {
        // Only the first attempt of a turn transitions Picked -> Implementing;
        // retries within the same turn are already in Implementing and a
        // self-transition is not in the legal edge set.
        if sbi.status() == Status::Picked {
            sbi.update_status(Status::Implementing)?;
        }
        let turn = sbi.execution_state.current_turn;
        self.workspace.ensure_sbi_dirs(sbi.id(), turn).await?;

        let built = self
            .prompts
            .build(sbi.id(), &sbi.metadata.labels, &implement_prompt(sbi))
            .await?;
        for warning in &built.warnings {
            tracing::warn!(sbi_id = %sbi.id(), warning, "prompt builder warning");
        }

        let invocation = self.agent.invoke(&self.agent_name, &built.prompt).await?;
        let elapsed_ms = invocation.elapsed_ms;

        if invocation.is_success() {
            let artifact_path = self
                .workspace
                .turn_artifacts_dir(sbi.id(), turn)
                .join("implement.txt");
            sbi.add_artifact(artifact_path.to_string_lossy().to_string());
            sbi.update_status(Status::Reviewing)?;
            self.save_and_journal(
                sbi,
                Step::Implement,
                Decision::Pending,
                elapsed_ms,
                String::new(),
                vec![Artifact::Path(artifact_path.to_string_lossy().to_string())],
            )
            .await?;
            tracing::info!(sbi_id = %sbi.id(), turn, "implement succeeded, advancing to review");
        } else {
            let error = if invocation.is_fatal() {
                invocation.stderr.clone()
            } else {
                format!("retryable: {}", invocation.stderr)
            };
            sbi.record_error(error.clone());

            if sbi.execution_state.current_attempt >= MAX_ATTEMPTS || invocation.is_fatal() {
                sbi.update_status(Status::Failed)?;
                tracing::error!(sbi_id = %sbi.id(), turn, attempt = sbi.execution_state.current_attempt, "implement attempts exhausted");
            } else {
                sbi.increment_attempt();
            }

            // Per the journal vocabulary, a FAILED state projects to a
            // PENDING journal decision with a non-empty error; the
            // validator rejects a literal FAILED decision.
            self.save_and_journal(sbi, Step::Implement, Decision::Pending, elapsed_ms, error, vec![])
                .await?;
        }
        Ok(sbi.status())
    }

    async fn step_review(&self, sbi: &mut Sbi) -> Result<Status> {
        let turn = sbi.execution_state.current_turn;
        let built = self
            .prompts
            .build(sbi.id(), &sbi.metadata.labels, &review_prompt(sbi))
            .await?;
        for warning in &built.warnings {
            tracing::warn!(sbi_id = %sbi.id(), warning, "prompt builder warning");
        }

        let invocation = self.agent.invoke(&self.agent_name, &built.prompt).await?;
        let elapsed_ms = invocation.elapsed_ms;
        let decision = ReviewDecision::parse(&invocation.stdout)?;

        let (next_status, journal_decision, error) = match decision {
            ReviewDecision::Succeeded => (Status::Done, Decision::Ok, String::new()),
            ReviewDecision::NeedsChanges => (Status::Implementing, Decision::NeedsChanges, String::new()),
            ReviewDecision::Failed => (Status::Failed, Decision::Pending, "review reported FAILED".to_string()),
        };
        sbi.update_status(next_status)?;
        if next_status == Status::Implementing {
            sbi.increment_turn();
        }
        if !error.is_empty() {
            sbi.record_error(error.clone());
        }

        let mut artifacts = Vec::new();
        if decision == ReviewDecision::NeedsChanges {
            if let Some(code) = reason_code(&invocation.stdout) {
                self.workspace
                    .write_file(
                        &self.workspace.fb_draft_path(sbi.id()),
                        format!("reasonCode: {code}\n").as_bytes(),
                    )
                    .await?;
                let mut draft = serde_json::Map::new();
                draft.insert("type".into(), "fb_sbi_draft".into());
                draft.insert("reasonCode".into(), code.into());
                draft.insert("taskId".into(), sbi.id().clone().into());
                artifacts.push(Artifact::Object(draft));
            }
        } else if decision == ReviewDecision::Succeeded {
            // A prior turn drafted feedback (fb_sbi_draft) for this SBI; a
            // successful registration (this review passing) closes it out
            // with fb_sbi_registered, unless it was already closed out.
            let has_draft = self
                .journal
                .find_by_sbi(sbi.id())
                .await?
                .iter()
                .any(|r| r.artifacts.iter().any(|a| a.object_type() == Some("fb_sbi_draft")));
            if has_draft && !self.journal.is_already_registered(sbi.id()).await? {
                let mut registered = serde_json::Map::new();
                registered.insert("type".into(), "fb_sbi_registered".into());
                registered.insert("taskId".into(), sbi.id().clone().into());
                artifacts.push(Artifact::Object(registered));
            }
        }

        self.save_and_journal(sbi, Step::Review, journal_decision, elapsed_ms, error, artifacts)
            .await?;
        tracing::info!(sbi_id = %sbi.id(), turn, status = ?sbi.status(), "review completed");
        Ok(sbi.status())
    }

    /// Persist the SBI, then append the matching journal record. The
    /// spec requires these two writes to be atomic together; the
    /// in-memory/file backends here do it as a best-effort sequential
    /// pair rather than a true crash-atomic WAL.
    async fn save_and_journal(
        &self,
        sbi: &mut Sbi,
        step: Step,
        decision: Decision,
        elapsed_ms: u64,
        error: String,
        artifacts: Vec<Artifact>,
    ) -> Result<()> {
        self.sbis.save(sbi).await?;
        let record = JournalRecord {
            timestamp: to_rfc3339_nanos(now()),
            sbi_id: sbi.id().clone(),
            turn: sbi.execution_state.current_turn,
            step,
            decision,
            elapsed_ms,
            error,
            artifacts,
        };
        self.journal.append(&record).await
    }
}

fn implement_prompt(sbi: &Sbi) -> String {
    format!("Implement: {}\n\n{}", sbi.title(), sbi.description())
}

fn review_prompt(sbi: &Sbi) -> String {
    format!("Review the implementation of: {}", sbi.title())
}
