//! End-to-end: a label whose template file is edited out from under the
//! catalog after registration. The turn engine must still complete the
//! turn, surfacing the integrity warning through `tracing` rather than
//! failing the step outright.

use std::sync::Arc;

use async_trait::async_trait;

use taskflow_core::domain::{Sbi, Status, TaskCore};
use taskflow_core::engine::{Agent, AgentInvocation, LabelPromptBuilder, TurnEngine};
use taskflow_core::error::Result;
use taskflow_core::journal::{InMemoryJournal, Journal};
use taskflow_core::label::{InMemoryLabelCatalog, LabelCatalog};
use taskflow_core::lock::InMemoryLockManager;
use taskflow_core::repository::{InMemoryTaskRepository, SbiRepo};
use taskflow_core::workspace::Workspace;

struct ClaudeDouble;

#[async_trait]
impl Agent for ClaudeDouble {
    async fn invoke(&self, _agent_name: &str, prompt: &str) -> Result<AgentInvocation> {
        let stdout = if prompt.starts_with("Review") {
            "SUCCEEDED".to_string()
        } else {
            String::new()
        };
        Ok(AgentInvocation {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            elapsed_ms: 4,
        })
    }
}

#[tokio::test]
async fn modified_label_template_does_not_block_the_turn() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Arc::new(Workspace::new(dir.path()));
    workspace.ensure_dirs().await.unwrap();

    let template_path = workspace.label_template_path("backend");
    workspace
        .write_file(&template_path, b"Follow backend conventions.")
        .await
        .unwrap();

    let catalog = Arc::new(InMemoryLabelCatalog::new());
    catalog
        .register("backend", "backend work", vec![template_path.clone()], None, 0, "#336699", true)
        .await
        .unwrap();

    // The template is edited after the label was registered, so its
    // stored hash no longer matches what's on disk.
    workspace.write_file(&template_path, b"Follow NEW backend conventions.").await.unwrap();

    let repo = Arc::new(InMemoryTaskRepository::new());
    let journal = Arc::new(InMemoryJournal::new());
    let engine = TurnEngine::new(
        Arc::new(InMemoryLockManager::new()),
        repo.clone(),
        journal.clone(),
        Arc::new(LabelPromptBuilder::new(catalog)),
        Arc::new(ClaudeDouble),
        workspace,
        "claude",
    );

    let mut sbi = Sbi::new("Add a caching layer".into(), String::new(), None, 1).unwrap();
    sbi.metadata.labels = vec!["backend".to_string()];
    let sbi_id = sbi.id().clone();
    SbiRepo::save(&*repo, &sbi).await.unwrap();

    engine.execute_turn(&sbi_id).await.unwrap();
    let after_implement = engine.execute_turn(&sbi_id).await.unwrap();
    assert_eq!(after_implement, Status::Reviewing);

    let done = engine.execute_turn(&sbi_id).await.unwrap();
    assert_eq!(done, Status::Done);
}
