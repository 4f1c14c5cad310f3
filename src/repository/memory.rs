//! In-memory repository implementation: one `tokio::sync::RwLock<Inner>`
//! guarding every task map and both reverse indices, the same shape as
//! `MemoryStore`'s single `RwLock<Inner>` in `bpmn-lite-core`.

use std::collections::HashMap;

use async_trait::async_trait;

use super::filter::TaskFilter;
use super::traits::{EpicRepo, PbiRepo, SbiRepo, TaskRepo};
use crate::domain::{Epic, Pbi, Sbi, Status, Task, TaskCore, TaskId};
use crate::error::{EngineError, Result};

struct Inner {
    epics: HashMap<TaskId, Epic>,
    pbis: HashMap<TaskId, Pbi>,
    sbis: HashMap<TaskId, Sbi>,
    /// Derived cache: pbiId -> epicId, rebuilt from `Epic::pbi_ids` on save.
    pbi_to_epic: HashMap<TaskId, TaskId>,
    /// Derived cache: sbiId -> pbiId, rebuilt from `Pbi::sbi_ids` on save.
    sbi_to_pbi: HashMap<TaskId, TaskId>,
    next_sequence: u64,
    dependencies: HashMap<TaskId, Vec<TaskId>>,
}

pub struct InMemoryTaskRepository {
    inner: tokio::sync::RwLock<Inner>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            inner: tokio::sync::RwLock::new(Inner {
                epics: HashMap::new(),
                pbis: HashMap::new(),
                sbis: HashMap::new(),
                pbi_to_epic: HashMap::new(),
                sbi_to_pbi: HashMap::new(),
                next_sequence: 1,
                dependencies: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn task_labels(task: &Task) -> &[String] {
    match task {
        Task::Epic(e) => &e.metadata.labels,
        Task::Pbi(p) => &p.metadata.labels,
        Task::Sbi(s) => &s.metadata.labels,
    }
}

#[async_trait]
impl EpicRepo for InMemoryTaskRepository {
    async fn find(&self, id: &TaskId) -> Result<Epic> {
        let guard = self.inner.read().await;
        guard
            .epics
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("epic {id}")))
    }

    async fn save(&self, epic: &Epic) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.pbi_to_epic.retain(|_, owner| owner != &epic.header.id);
        for pbi_id in &epic.pbi_ids {
            guard.pbi_to_epic.insert(pbi_id.clone(), epic.header.id.clone());
        }
        guard.epics.insert(epic.header.id.clone(), epic.clone());
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let epic = guard
            .epics
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("epic {id}")))?;
        if !epic.can_delete() {
            return Err(EngineError::InvariantViolation(format!(
                "epic {id} has children, cannot delete"
            )));
        }
        guard.epics.remove(id);
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Epic>> {
        let guard = self.inner.read().await;
        let matched: Vec<Epic> = guard
            .epics
            .values()
            .filter(|e| {
                filter.matches(
                    e.task_type(),
                    e.status(),
                    e.current_step(),
                    e.parent_task_id(),
                    &e.metadata.labels,
                )
            })
            .cloned()
            .collect();
        Ok(filter.paginate(matched))
    }
}

#[async_trait]
impl PbiRepo for InMemoryTaskRepository {
    async fn find(&self, id: &TaskId) -> Result<Pbi> {
        let guard = self.inner.read().await;
        guard
            .pbis
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("pbi {id}")))
    }

    async fn save(&self, pbi: &Pbi) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.sbi_to_pbi.retain(|_, owner| owner != &pbi.header.id);
        for sbi_id in &pbi.sbi_ids {
            guard.sbi_to_pbi.insert(sbi_id.clone(), pbi.header.id.clone());
        }
        guard.pbis.insert(pbi.header.id.clone(), pbi.clone());
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let pbi = guard
            .pbis
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("pbi {id}")))?;
        if !pbi.can_delete() {
            return Err(EngineError::InvariantViolation(format!(
                "pbi {id} has children, cannot delete"
            )));
        }
        guard.pbis.remove(id);
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Pbi>> {
        let guard = self.inner.read().await;
        let matched: Vec<Pbi> = guard
            .pbis
            .values()
            .filter(|p| {
                filter.matches(
                    p.task_type(),
                    p.status(),
                    p.current_step(),
                    p.parent_task_id(),
                    &p.metadata.labels,
                )
            })
            .cloned()
            .collect();
        Ok(filter.paginate(matched))
    }
}

#[async_trait]
impl SbiRepo for InMemoryTaskRepository {
    async fn find(&self, id: &TaskId) -> Result<Sbi> {
        let guard = self.inner.read().await;
        guard
            .sbis
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("sbi {id}")))
    }

    async fn save(&self, sbi: &Sbi) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.sbis.insert(sbi.header.id.clone(), sbi.clone());
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let sbi = guard
            .sbis
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("sbi {id}")))?;
        if !sbi.can_delete() {
            return Err(EngineError::InvariantViolation(format!(
                "sbi {id} is implementing, cannot delete"
            )));
        }
        let dependents: Vec<TaskId> = guard
            .dependencies
            .iter()
            .filter(|(_, deps)| deps.contains(id))
            .map(|(dependent, _)| dependent.clone())
            .collect();
        if !dependents.is_empty() {
            return Err(EngineError::InvariantViolation(format!(
                "sbi {id} is a dependency of {dependents:?}, cannot delete"
            )));
        }
        guard.sbis.remove(id);
        guard.dependencies.remove(id);
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Sbi>> {
        let guard = self.inner.read().await;
        let matched: Vec<Sbi> = guard
            .sbis
            .values()
            .filter(|s| {
                filter.matches(
                    s.task_type(),
                    s.status(),
                    s.current_step(),
                    s.parent_task_id(),
                    &s.metadata.labels,
                )
            })
            .cloned()
            .collect();
        Ok(filter.paginate(matched))
    }

    async fn get_next_sequence(&self) -> Result<u64> {
        let mut guard = self.inner.write().await;
        let seq = guard.next_sequence;
        guard.next_sequence += 1;
        Ok(seq)
    }

    async fn find_by_pbi_id(&self, pbi_id: &TaskId) -> Result<Vec<Sbi>> {
        let guard = self.inner.read().await;
        Ok(guard
            .sbis
            .values()
            .filter(|s| s.parent_pbi_id.as_ref() == Some(pbi_id))
            .cloned()
            .collect())
    }

    async fn get_dependencies(&self, sbi_id: &TaskId) -> Result<Vec<TaskId>> {
        let guard = self.inner.read().await;
        Ok(guard.dependencies.get(sbi_id).cloned().unwrap_or_default())
    }

    async fn get_dependents(&self, sbi_id: &TaskId) -> Result<Vec<TaskId>> {
        let guard = self.inner.read().await;
        Ok(guard
            .dependencies
            .iter()
            .filter(|(_, deps)| deps.contains(sbi_id))
            .map(|(dependent, _)| dependent.clone())
            .collect())
    }

    async fn save_dependencies(&self, sbi_id: &TaskId, deps: Vec<TaskId>) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.dependencies.insert(sbi_id.clone(), deps);
        Ok(())
    }

    async fn reset_sbi_state(&self, id: &TaskId, status_str: &str) -> Result<()> {
        let status: Status = serde_json::from_value(serde_json::Value::String(status_str.to_string()))
            .map_err(|_| EngineError::InvariantViolation(format!("not a legal status: {status_str}")))?;
        let mut guard = self.inner.write().await;
        let sbi = guard
            .sbis
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("sbi {id}")))?;
        sbi.header.status = status;
        sbi.header.current_step = status.workflow_step();
        sbi.header.updated_at = crate::time::now();
        Ok(())
    }
}

#[async_trait]
impl TaskRepo for InMemoryTaskRepository {
    async fn find(&self, id: &TaskId) -> Result<Task> {
        let guard = self.inner.read().await;
        if let Some(e) = guard.epics.get(id) {
            return Ok(Task::Epic(e.clone()));
        }
        if let Some(p) = guard.pbis.get(id) {
            return Ok(Task::Pbi(p.clone()));
        }
        if let Some(s) = guard.sbis.get(id) {
            return Ok(Task::Sbi(s.clone()));
        }
        Err(EngineError::NotFound(format!("task {id}")))
    }

    async fn save(&self, task: &Task) -> Result<()> {
        match task {
            Task::Epic(e) => EpicRepo::save(self, e).await,
            Task::Pbi(p) => PbiRepo::save(self, p).await,
            Task::Sbi(s) => SbiRepo::save(self, s).await,
        }
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let guard = self.inner.read().await;
        let kind = if guard.epics.contains_key(id) {
            0
        } else if guard.pbis.contains_key(id) {
            1
        } else if guard.sbis.contains_key(id) {
            2
        } else {
            return Err(EngineError::NotFound(format!("task {id}")));
        };
        drop(guard);
        match kind {
            0 => EpicRepo::delete(self, id).await,
            1 => PbiRepo::delete(self, id).await,
            _ => SbiRepo::delete(self, id).await,
        }
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let guard = self.inner.read().await;
        let mut matched: Vec<Task> = Vec::new();
        matched.extend(guard.epics.values().cloned().map(Task::Epic));
        matched.extend(guard.pbis.values().cloned().map(Task::Pbi));
        matched.extend(guard.sbis.values().cloned().map(Task::Sbi));
        let matched: Vec<Task> = matched
            .into_iter()
            .filter(|t| {
                filter.matches(
                    t.task_type(),
                    t.status(),
                    t.current_step(),
                    t.parent_task_id(),
                    task_labels(t),
                )
            })
            .collect();
        Ok(filter.paginate(matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_rebuilds_pbi_to_epic_index_on_reassignment() {
        let repo = InMemoryTaskRepository::new();
        let mut epic_a = Epic::new("A".into(), String::new()).unwrap();
        epic_a.add_pbi("p1".into()).unwrap();
        EpicRepo::save(&repo, &epic_a).await.unwrap();

        let mut epic_b = Epic::new("B".into(), String::new()).unwrap();
        EpicRepo::save(&repo, &epic_b).await.unwrap();

        // Reassign p1 away from epic_a to epic_b.
        epic_a.remove_pbi(&"p1".to_string()).unwrap();
        EpicRepo::save(&repo, &epic_a).await.unwrap();
        epic_b.add_pbi("p1".into()).unwrap();
        EpicRepo::save(&repo, &epic_b).await.unwrap();

        let guard = repo.inner.read().await;
        assert_eq!(guard.pbi_to_epic.get("p1"), Some(&epic_b.header.id));
    }

    #[tokio::test]
    async fn sequence_is_strictly_monotone() {
        let repo = InMemoryTaskRepository::new();
        let a = repo.get_next_sequence().await.unwrap();
        let b = repo.get_next_sequence().await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn delete_rejects_sbi_with_dependents() {
        let repo = InMemoryTaskRepository::new();
        let sbi = Sbi::new("S1".into(), String::new(), None, 1).unwrap();
        let dependent = Sbi::new("S2".into(), String::new(), None, 2).unwrap();
        SbiRepo::save(&repo, &sbi).await.unwrap();
        SbiRepo::save(&repo, &dependent).await.unwrap();
        repo.save_dependencies(&dependent.header.id, vec![sbi.header.id.clone()])
            .await
            .unwrap();

        let result = SbiRepo::delete(&repo, &sbi.header.id).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reset_sbi_state_validates_status_string() {
        let repo = InMemoryTaskRepository::new();
        let sbi = Sbi::new("S1".into(), String::new(), None, 1).unwrap();
        SbiRepo::save(&repo, &sbi).await.unwrap();

        assert!(repo.reset_sbi_state(&sbi.header.id, "NOT_A_STATUS").await.is_err());
        repo.reset_sbi_state(&sbi.header.id, "FAILED").await.unwrap();
        let reloaded = SbiRepo::find(&repo, &sbi.header.id).await.unwrap();
        assert_eq!(reloaded.header.status, Status::Failed);
    }

    #[tokio::test]
    async fn list_limit_zero_is_unbounded() {
        let repo = InMemoryTaskRepository::new();
        for i in 0..3 {
            let epic = Epic::new(format!("E{i}"), String::new()).unwrap();
            EpicRepo::save(&repo, &epic).await.unwrap();
        }
        let filter = TaskFilter::default();
        let found = EpicRepo::list(&repo, &filter).await.unwrap();
        assert_eq!(found.len(), 3);
    }
}
