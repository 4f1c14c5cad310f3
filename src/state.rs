//! Process-level execution state (`var/state.json`): the engine's single
//! shared snapshot of where it is overall, distinct from the per-SBI
//! `domain::sbi::ExecutionState`. Grounded on the same `version`-guarded
//! save the spec's design note prescribes (§9: "any save that finds a
//! different version on disk fails with `InvariantViolation`") and on
//! `bpmn-lite-core::store_memory::MemoryStore`'s rename-into-place file
//! persistence for its on-disk sibling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{TaskId, WorkflowStep};
use crate::error::{EngineError, Result};
use crate::time::{now, to_rfc3339_nanos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "WIP")]
    Wip,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "REVIEW&WIP")]
    ReviewAndWip,
    #[serde(rename = "DONE")]
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateDecision {
    Pending,
    NeedsChanges,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Meta {
    updated_at: String,
}

/// `var/state.json`'s schema. `deny_unknown_fields` is what actually
/// enforces the spec's "the legacy key `current` MUST be absent" rule: a
/// stray `current` key fails deserialization outright rather than needing
/// a bespoke check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessState {
    pub version: u32,
    pub step: WorkflowStep,
    pub status: ProcessStatus,
    pub turn: u32,
    /// Empty string means idle, per spec.md §3 (`wipSbiId (empty=idle)`) —
    /// not an `Option`, so the on-disk shape matches the spec literally.
    #[serde(default)]
    pub wip_sbi_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    #[serde(default)]
    pub last_artifacts: HashMap<String, Value>,
    pub decision: StateDecision,
    pub attempt: u32,
    meta: Meta,
}

impl ProcessState {
    /// A fresh, idle state at version 1.
    pub fn new() -> Self {
        Self {
            version: 1,
            step: WorkflowStep::Pick,
            status: ProcessStatus::Ready,
            turn: 0,
            wip_sbi_id: String::new(),
            lease_expires_at: None,
            inputs: HashMap::new(),
            last_artifacts: HashMap::new(),
            decision: StateDecision::Pending,
            attempt: 1,
            meta: Meta {
                updated_at: to_rfc3339_nanos(now()),
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.wip_sbi_id.is_empty()
    }

    pub fn updated_at(&self) -> &str {
        &self.meta.updated_at
    }

    /// Begin tracking `sbi_id` as the in-flight work item, moving to WIP.
    pub fn begin_wip(&mut self, sbi_id: &TaskId, lease_expires_at: DateTime<Utc>) {
        self.status = ProcessStatus::Wip;
        self.wip_sbi_id = sbi_id.clone();
        self.lease_expires_at = Some(lease_expires_at);
    }

    pub fn enter_review(&mut self) {
        self.status = match self.status {
            ProcessStatus::Wip => ProcessStatus::Review,
            other => other,
        };
    }

    pub fn return_to_ready(&mut self) {
        self.status = ProcessStatus::Ready;
        self.wip_sbi_id.clear();
        self.lease_expires_at = None;
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

/// `var/state.json` persistence, guarded by optimistic concurrency: a
/// `save` whose `state.version` doesn't match what's currently persisted
/// fails with `InvariantViolation` rather than silently overwriting a
/// concurrent writer's update (spec.md §9).
#[async_trait]
pub trait StateRepository: Send + Sync {
    async fn load(&self) -> Result<ProcessState>;
    /// Persist `state`, bumping its version by one on success. The
    /// caller passes the version it last loaded; a mismatch against
    /// what's currently stored means someone else wrote in between.
    async fn save(&self, state: &ProcessState) -> Result<()>;
}

fn check_version_and_bump(current: Option<&ProcessState>, incoming: &ProcessState) -> Result<ProcessState> {
    if let Some(current) = current {
        if current.version != incoming.version {
            return Err(EngineError::InvariantViolation(format!(
                "state.json version conflict: expected {}, found {}",
                incoming.version, current.version
            )));
        }
    }
    let mut next = incoming.clone();
    next.version += 1;
    next.meta.updated_at = to_rfc3339_nanos(now());
    Ok(next)
}

/// In-memory state repository, for tests and scenarios with no on-disk
/// workspace.
pub struct InMemoryStateRepository {
    state: tokio::sync::Mutex<Option<ProcessState>>,
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self {
            state: tokio::sync::Mutex::new(None),
        }
    }
}

impl Default for InMemoryStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn load(&self) -> Result<ProcessState> {
        let guard = self.state.lock().await;
        Ok(guard.clone().unwrap_or_default())
    }

    async fn save(&self, state: &ProcessState) -> Result<()> {
        let mut guard = self.state.lock().await;
        let next = check_version_and_bump(guard.as_ref(), state)?;
        *guard = Some(next);
        Ok(())
    }
}

/// File-backed state repository at `<root>/var/state.json`. Writes go to
/// a sibling temp file and are renamed into place, matching spec.md §5's
/// "State-file writes use rename-into-place".
pub struct FileStateRepository {
    path: PathBuf,
    write_guard: tokio::sync::Mutex<()>,
}

impl FileStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_current(&self) -> Result<Option<ProcessState>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StateRepository for FileStateRepository {
    async fn load(&self) -> Result<ProcessState> {
        Ok(self.read_current().await?.unwrap_or_default())
    }

    async fn save(&self, state: &ProcessState) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let current = self.read_current().await?;
        let next = check_version_and_bump(current.as_ref(), state)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&next)?;
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialization_rejects_the_forbidden_current_key() {
        let json = serde_json::json!({
            "version": 1,
            "step": "implement",
            "status": "WIP",
            "turn": 1,
            "wipSbiId": "s1",
            "current": "stale",
            "decision": "PENDING",
            "attempt": 1,
            "meta": {"updated_at": "2024-01-01T00:00:00.000000000Z"}
        });
        let result: std::result::Result<ProcessState, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn idle_is_empty_wip_sbi_id() {
        let state = ProcessState::new();
        assert!(state.is_idle());
    }

    #[test]
    fn begin_wip_then_return_to_ready_round_trips() {
        let mut state = ProcessState::new();
        state.begin_wip(&"s1".to_string(), Utc::now());
        assert!(!state.is_idle());
        assert_eq!(state.status, ProcessStatus::Wip);
        state.return_to_ready();
        assert!(state.is_idle());
        assert_eq!(state.status, ProcessStatus::Ready);
    }

    #[tokio::test]
    async fn in_memory_save_bumps_version_and_rejects_stale_writer() {
        let repo = InMemoryStateRepository::new();
        let mut state = repo.load().await.unwrap();
        assert_eq!(state.version, 1);

        state.turn = 1;
        repo.save(&state).await.unwrap();
        let reloaded = repo.load().await.unwrap();
        assert_eq!(reloaded.version, 2);
        assert_eq!(reloaded.turn, 1);

        // `state` is now stale (still version 1); saving it again must
        // conflict rather than silently clobber the version-2 write.
        let result = repo.save(&state).await;
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn file_repository_round_trips_through_rename_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var/state.json");
        let repo = FileStateRepository::new(&path);

        let mut state = repo.load().await.unwrap();
        state.turn = 3;
        state.status = ProcessStatus::Review;
        repo.save(&state).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded = repo.load().await.unwrap();
        assert_eq!(reloaded.turn, 3);
        assert_eq!(reloaded.version, 2);
        assert_eq!(reloaded.status, ProcessStatus::Review);
    }

    #[tokio::test]
    async fn file_repository_missing_file_loads_as_fresh_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var/state.json");
        let repo = FileStateRepository::new(&path);
        let state = repo.load().await.unwrap();
        assert_eq!(state.version, 1);
        assert!(state.is_idle());
    }
}
