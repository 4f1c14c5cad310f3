//! Label catalog: content-hashed prompt fragments, attachable to tasks and
//! organized into a forest via `parent_label_id`.
//!
//! Structured as an in-memory store behind an async trait, the same shape
//! as `InMemoryLockManager`: one mutex guarding everything, since registration,
//! attach/detach, and cascade-delete are all read-modify-write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::integrity::hash_file;
use crate::domain::TaskId;
use crate::error::{EngineError, Result};

pub type LabelId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub description: String,
    pub template_paths: Vec<PathBuf>,
    pub content_hashes: HashMap<PathBuf, String>,
    pub parent_label_id: Option<LabelId>,
    pub priority: i32,
    pub color: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
struct Attachment {
    label_id: LabelId,
    position: i64,
}

#[async_trait]
pub trait LabelCatalog: Send + Sync {
    /// Register a new label, hashing every template path's current bytes.
    async fn register(
        &self,
        name: &str,
        description: &str,
        template_paths: Vec<PathBuf>,
        parent_label_id: Option<LabelId>,
        priority: i32,
        color: &str,
        active: bool,
    ) -> Result<Label>;

    async fn find_by_id(&self, id: LabelId) -> Result<Label>;
    async fn find_by_name(&self, name: &str) -> Result<Label>;
    async fn find_children(&self, parent_id: LabelId) -> Result<Vec<Label>>;
    /// `None` returns the roots (labels with no parent).
    async fn find_by_parent_id(&self, parent_id: Option<LabelId>) -> Result<Vec<Label>>;

    /// Attach `label_id` to `task_id` at `position`. Reattaching the same
    /// label updates its position in place rather than duplicating it.
    async fn attach_to_task(&self, task_id: &TaskId, label_id: LabelId, position: i64) -> Result<()>;
    async fn detach_from_task(&self, task_id: &TaskId, label_id: LabelId) -> Result<()>;
    async fn find_labels_by_task(&self, task_id: &TaskId) -> Result<Vec<Label>>;

    /// Delete a label, cascading: every task attachment of it is removed,
    /// and it no longer appears as anyone's parent.
    async fn delete(&self, label_id: LabelId) -> Result<()>;
}

pub struct InMemoryLabelCatalog {
    inner: tokio::sync::Mutex<Inner>,
}

struct Inner {
    next_id: LabelId,
    labels: HashMap<LabelId, Label>,
    attachments: HashMap<TaskId, Vec<Attachment>>,
}

impl InMemoryLabelCatalog {
    pub fn new() -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Inner {
                next_id: 1,
                labels: HashMap::new(),
                attachments: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryLabelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

async fn hash_all(paths: &[PathBuf]) -> Result<HashMap<PathBuf, String>> {
    let mut hashes = HashMap::new();
    for path in paths {
        hashes.insert(path.clone(), hash_file(path as &Path).await?);
    }
    Ok(hashes)
}

#[async_trait]
impl LabelCatalog for InMemoryLabelCatalog {
    async fn register(
        &self,
        name: &str,
        description: &str,
        template_paths: Vec<PathBuf>,
        parent_label_id: Option<LabelId>,
        priority: i32,
        color: &str,
        active: bool,
    ) -> Result<Label> {
        let content_hashes = hash_all(&template_paths).await?;
        let mut guard = self.inner.lock().await;

        if let Some(parent) = parent_label_id {
            if !guard.labels.contains_key(&parent) {
                return Err(EngineError::NotFound(format!("parent label {parent}")));
            }
        }

        let id = guard.next_id;
        guard.next_id += 1;
        let label = Label {
            id,
            name: name.to_string(),
            description: description.to_string(),
            template_paths,
            content_hashes,
            parent_label_id,
            priority,
            color: color.to_string(),
            active,
        };
        guard.labels.insert(id, label.clone());
        tracing::debug!(label_id = id, name, "label registered");
        Ok(label)
    }

    async fn find_by_id(&self, id: LabelId) -> Result<Label> {
        let guard = self.inner.lock().await;
        guard
            .labels
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("label {id}")))
    }

    async fn find_by_name(&self, name: &str) -> Result<Label> {
        let guard = self.inner.lock().await;
        guard
            .labels
            .values()
            .find(|l| l.name == name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("label {name}")))
    }

    async fn find_children(&self, parent_id: LabelId) -> Result<Vec<Label>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .labels
            .values()
            .filter(|l| l.parent_label_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn find_by_parent_id(&self, parent_id: Option<LabelId>) -> Result<Vec<Label>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .labels
            .values()
            .filter(|l| l.parent_label_id == parent_id)
            .cloned()
            .collect())
    }

    async fn attach_to_task(&self, task_id: &TaskId, label_id: LabelId, position: i64) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if !guard.labels.contains_key(&label_id) {
            return Err(EngineError::NotFound(format!("label {label_id}")));
        }
        let entries = guard.attachments.entry(task_id.clone()).or_default();
        if let Some(existing) = entries.iter_mut().find(|a| a.label_id == label_id) {
            existing.position = position;
        } else {
            entries.push(Attachment { label_id, position });
        }
        Ok(())
    }

    async fn detach_from_task(&self, task_id: &TaskId, label_id: LabelId) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let entries = guard
            .attachments
            .get_mut(task_id)
            .ok_or_else(|| EngineError::NotFound(format!("no labels attached to {task_id}")))?;
        let before = entries.len();
        entries.retain(|a| a.label_id != label_id);
        if entries.len() == before {
            return Err(EngineError::NotFound(format!(
                "label {label_id} not attached to {task_id}"
            )));
        }
        Ok(())
    }

    async fn find_labels_by_task(&self, task_id: &TaskId) -> Result<Vec<Label>> {
        let guard = self.inner.lock().await;
        let Some(entries) = guard.attachments.get(task_id) else {
            return Ok(Vec::new());
        };
        let mut entries = entries.clone();
        entries.sort_by_key(|a| a.position);
        Ok(entries
            .into_iter()
            .filter_map(|a| guard.labels.get(&a.label_id).cloned())
            .collect())
    }

    async fn delete(&self, label_id: LabelId) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.labels.remove(&label_id).is_none() {
            return Err(EngineError::NotFound(format!("label {label_id}")));
        }
        for entries in guard.attachments.values_mut() {
            entries.retain(|a| a.label_id != label_id);
        }
        tracing::debug!(label_id, "label deleted, cascaded to attachments");
        Ok(())
    }
}
