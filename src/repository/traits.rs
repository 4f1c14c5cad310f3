//! Repository contracts: `Find/Save/Delete/List` per task kind, plus the
//! SBI-specific sequence/dependency/admin-override surface.

use async_trait::async_trait;

use super::filter::TaskFilter;
use crate::domain::{Epic, Pbi, Sbi, Task, TaskId};
use crate::error::Result;

#[async_trait]
pub trait EpicRepo: Send + Sync {
    async fn find(&self, id: &TaskId) -> Result<Epic>;
    /// Idempotent upsert. Rebuilds the PBI→Epic reverse index by clearing
    /// this epic's previously recorded children before re-inserting the
    /// current `pbi_ids`.
    async fn save(&self, epic: &Epic) -> Result<()>;
    async fn delete(&self, id: &TaskId) -> Result<()>;
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Epic>>;
}

#[async_trait]
pub trait PbiRepo: Send + Sync {
    async fn find(&self, id: &TaskId) -> Result<Pbi>;
    async fn save(&self, pbi: &Pbi) -> Result<()>;
    async fn delete(&self, id: &TaskId) -> Result<()>;
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Pbi>>;
}

#[async_trait]
pub trait SbiRepo: Send + Sync {
    async fn find(&self, id: &TaskId) -> Result<Sbi>;
    async fn save(&self, sbi: &Sbi) -> Result<()>;
    async fn delete(&self, id: &TaskId) -> Result<()>;
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Sbi>>;

    /// Strictly monotone, persistent sequence counter.
    async fn get_next_sequence(&self) -> Result<u64>;
    async fn find_by_pbi_id(&self, pbi_id: &TaskId) -> Result<Vec<Sbi>>;
    async fn get_dependencies(&self, sbi_id: &TaskId) -> Result<Vec<TaskId>>;
    async fn get_dependents(&self, sbi_id: &TaskId) -> Result<Vec<TaskId>>;
    /// Replace the dependency set for `sbi_id` atomically.
    async fn save_dependencies(&self, sbi_id: &TaskId, deps: Vec<TaskId>) -> Result<()>;
    /// Admin override: sets the SBI's status to `status_str` directly,
    /// bypassing the transition table, but still rejects a string that
    /// doesn't name a legal `Status` value.
    async fn reset_sbi_state(&self, id: &TaskId, status_str: &str) -> Result<()>;
}

#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn find(&self, id: &TaskId) -> Result<Task>;
    async fn save(&self, task: &Task) -> Result<()>;
    async fn delete(&self, id: &TaskId) -> Result<()>;
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>>;
}
