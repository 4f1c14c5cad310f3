//! End-to-end: two concurrent turns against the same SBI. Exactly one
//! proceeds and appends a journal record; the other is rejected as Busy
//! with no side effects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use taskflow_core::domain::{Sbi, TaskCore, TaskId};
use taskflow_core::engine::{Agent, AgentInvocation, PromptBuilder, PromptResult, TurnEngine};
use taskflow_core::error::{EngineError, Result};
use taskflow_core::journal::{Journal, InMemoryJournal};
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

struct NeverCalled;

#[async_trait]
impl Agent for NeverCalled {
    async fn invoke(&self, _agent_name: &str, _prompt: &str) -> Result<AgentInvocation> {
        panic!("the agent must not be invoked once the run lock is held elsewhere");
    }
}

#[tokio::test]
async fn concurrent_turn_on_the_same_sbi_yields_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Arc::new(Workspace::new(dir.path()));
    workspace.ensure_dirs().await.unwrap();

    let repo = Arc::new(InMemoryTaskRepository::new());
    let journal = Arc::new(InMemoryJournal::new());
    let locks = Arc::new(InMemoryLockManager::new());
    let engine = TurnEngine::new(
        locks.clone(),
        repo.clone(),
        journal.clone(),
        Arc::new(NullPromptBuilder),
        Arc::new(NeverCalled),
        workspace,
        "claude",
    );

    let sbi = Sbi::new("Untouched while locked".into(), String::new(), None, 1).unwrap();
    let sbi_id = sbi.id().clone();
    SbiRepo::save(&*repo, &sbi).await.unwrap();

    // Simulate another process already holding the run lock for this SBI.
    let lock_id = format!("run:{sbi_id}");
    locks.acquire_run(&lock_id, Duration::from_secs(30)).await.unwrap();

    let result = engine.execute_turn(&sbi_id).await;
    assert!(matches!(result, Err(EngineError::Busy(_))));

    assert!(journal.load().await.unwrap().records.is_empty());
    let unchanged = SbiRepo::find(&*repo, &sbi_id).await.unwrap();
    assert_eq!(unchanged.execution_state.current_turn, 0);
}
