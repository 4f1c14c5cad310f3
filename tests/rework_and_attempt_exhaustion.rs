//! End-to-end: a rework loop that eventually succeeds, and a sibling SBI
//! whose implement step keeps failing until attempts are exhausted.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use taskflow_core::domain::{Sbi, Status, TaskCore, TaskId};
use taskflow_core::engine::{Agent, AgentInvocation, PromptBuilder, PromptResult, TurnEngine};
use taskflow_core::error::Result;
use taskflow_core::journal::{Decision, Journal, InMemoryJournal, Step};
use taskflow_core::lock::InMemoryLockManager;
use taskflow_core::repository::{InMemoryTaskRepository, SbiRepo};
use taskflow_core::workspace::Workspace;

struct NullPromptBuilder;

#[async_trait]
impl PromptBuilder for NullPromptBuilder {
    async fn build(&self, _task_id: &TaskId, _labels: &[String], base_prompt: &str) -> Result<PromptResult> {
        Ok(PromptResult {
            prompt: base_prompt.to_string(),
            warnings: vec![],
        })
    }
}

/// Fails review exactly once with NEEDS_CHANGES, then succeeds.
struct OneReworkThenSucceed {
    review_calls: AtomicUsize,
}

#[async_trait]
impl Agent for OneReworkThenSucceed {
    async fn invoke(&self, _agent_name: &str, prompt: &str) -> Result<AgentInvocation> {
        let stdout = if prompt.starts_with("Review") {
            let n = self.review_calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                "NEEDS_CHANGES\nPATH_INVALID".to_string()
            } else {
                "SUCCEEDED".to_string()
            }
        } else {
            String::new()
        };
        Ok(AgentInvocation {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            elapsed_ms: 3,
        })
    }
}

/// Always fails implement with a retryable (non-FATAL) error.
struct AlwaysFailImplement;

#[async_trait]
impl Agent for AlwaysFailImplement {
    async fn invoke(&self, _agent_name: &str, _prompt: &str) -> Result<AgentInvocation> {
        Ok(AgentInvocation {
            stdout: String::new(),
            stderr: "boom".to_string(),
            exit_code: 1,
            elapsed_ms: 3,
        })
    }
}

#[tokio::test]
async fn rework_loop_recovers_and_eventually_reaches_done() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Arc::new(Workspace::new(dir.path()));
    workspace.ensure_dirs().await.unwrap();

    let repo = Arc::new(InMemoryTaskRepository::new());
    let journal = Arc::new(InMemoryJournal::new());
    let engine = TurnEngine::new(
        Arc::new(InMemoryLockManager::new()),
        repo.clone(),
        journal.clone(),
        Arc::new(NullPromptBuilder),
        Arc::new(OneReworkThenSucceed { review_calls: AtomicUsize::new(0) }),
        workspace.clone(),
        "claude",
    );

    let sbi = Sbi::new("Normalize path separators".into(), String::new(), None, 1).unwrap();
    let sbi_id = sbi.id().clone();
    SbiRepo::save(&*repo, &sbi).await.unwrap();

    engine.execute_turn(&sbi_id).await.unwrap(); // PENDING -> PICKED
    engine.execute_turn(&sbi_id).await.unwrap(); // PICKED -> REVIEWING
    let after_rework = engine.execute_turn(&sbi_id).await.unwrap(); // REVIEWING -> IMPLEMENTING
    assert_eq!(after_rework, Status::Implementing);

    let mid = SbiRepo::find(&*repo, &sbi_id).await.unwrap();
    assert_eq!(mid.execution_state.current_turn, 2);
    assert_eq!(mid.execution_state.current_attempt, 1);

    engine.execute_turn(&sbi_id).await.unwrap(); // IMPLEMENTING -> REVIEWING
    let done = engine.execute_turn(&sbi_id).await.unwrap(); // REVIEWING -> DONE
    assert_eq!(done, Status::Done);

    // the fb_sbi_draft artifact surfaces the reason code from the rework turn.
    let records = journal.load().await.unwrap().records;
    let rework_record = records
        .iter()
        .find(|r| r.decision == Decision::NeedsChanges)
        .expect("a NEEDS_CHANGES review record must exist");
    assert!(rework_record
        .artifacts
        .iter()
        .any(|a| a.object_type() == Some("fb_sbi_draft")));
    assert!(workspace.fb_draft_path(&sbi_id).exists());

    // the subsequent successful registration (this SBI's final DONE review)
    // closes the draft out with fb_sbi_registered for the same id.
    let done_record = records
        .iter()
        .find(|r| r.decision == Decision::Ok)
        .expect("an OK review record must exist");
    assert!(done_record
        .artifacts
        .iter()
        .any(|a| a.object_type() == Some("fb_sbi_registered")));
    assert!(journal.is_already_registered(&sbi_id).await.unwrap());
}

#[tokio::test]
async fn implement_attempts_exhaust_to_failed_without_a_fourth_record() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Arc::new(Workspace::new(dir.path()));
    workspace.ensure_dirs().await.unwrap();

    let repo = Arc::new(InMemoryTaskRepository::new());
    let journal = Arc::new(InMemoryJournal::new());
    let engine = TurnEngine::new(
        Arc::new(InMemoryLockManager::new()),
        repo.clone(),
        journal.clone(),
        Arc::new(NullPromptBuilder),
        Arc::new(AlwaysFailImplement),
        workspace,
        "claude",
    );

    let sbi = Sbi::new("Migrate the config loader".into(), String::new(), None, 1).unwrap();
    let sbi_id = sbi.id().clone();
    SbiRepo::save(&*repo, &sbi).await.unwrap();

    engine.execute_turn(&sbi_id).await.unwrap(); // PENDING -> PICKED
    engine.execute_turn(&sbi_id).await.unwrap(); // attempt 1 fails, -> 2
    engine.execute_turn(&sbi_id).await.unwrap(); // attempt 2 fails, -> 3
    let failed = engine.execute_turn(&sbi_id).await.unwrap(); // attempt 3 fails, exhausted
    assert_eq!(failed, Status::Failed);

    let reloaded = SbiRepo::find(&*repo, &sbi_id).await.unwrap();
    assert_eq!(reloaded.execution_state.current_attempt, 3);
    assert!(!reloaded.execution_state.last_error.is_empty());

    let records = journal.load().await.unwrap().records;
    let implement_records: Vec<_> = records.iter().filter(|r| r.step == Step::Implement).collect();
    assert_eq!(implement_records.len(), 3, "exactly three implement records, no fourth");
    assert!(implement_records.iter().all(|r| r.decision == Decision::Pending));
    assert!(implement_records.iter().all(|r| !r.decision.eq(&Decision::Ok)));

    // terminal: no further turns are driven.
    assert!(engine.execute_turn(&sbi_id).await.is_err());
}
