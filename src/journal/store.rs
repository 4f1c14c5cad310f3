//! Append-only journal. `append` is the only mutation; everything else is
//! a read over a consistent snapshot — the same shape as
//! `ProcessStore::append_event`/`read_events` in `bpmn-lite-core`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::record::JournalRecord;
use crate::domain::TaskId;
use crate::error::Result;

/// Result of loading the whole journal: the valid records plus any
/// non-fatal warnings collected along the way (malformed lines skipped,
/// turn monotonicity violations).
#[derive(Debug, Clone, Default)]
pub struct JournalLoad {
    pub records: Vec<JournalRecord>,
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait Journal: Send + Sync {
    /// Append one record. Takes a defensive deep copy of `record` so the
    /// caller mutating their copy afterwards can never corrupt the stored
    /// row.
    async fn append(&self, record: &JournalRecord) -> Result<()>;
    async fn load(&self) -> Result<JournalLoad>;
    async fn find_by_turn(&self, turn: u32) -> Result<Vec<JournalRecord>>;
    async fn find_by_sbi(&self, sbi_id: &TaskId) -> Result<Vec<JournalRecord>>;

    /// `true` if a `fb_sbi_registered` artifact marker exists for `task_id`.
    async fn is_already_registered(&self, task_id: &TaskId) -> Result<bool> {
        let loaded = self.load().await?;
        Ok(loaded.records.iter().any(|r| {
            r.sbi_id == *task_id
                && r.artifacts
                    .iter()
                    .any(|a| a.object_type() == Some("fb_sbi_registered"))
        }))
    }
}

/// Check turn-monotonicity per sbi_id over an ordered record sequence,
/// returning one warning string per violation (never an error).
fn monotonicity_warnings(records: &[JournalRecord]) -> Vec<String> {
    use std::collections::HashMap;
    let mut last_turn: HashMap<&str, u32> = HashMap::new();
    let mut warnings = Vec::new();
    for r in records {
        if let Some(&prev) = last_turn.get(r.sbi_id.as_str()) {
            if r.turn < prev {
                warnings.push(format!(
                    "journal turn monotonicity violated for sbi {}: {} then {}",
                    r.sbi_id, prev, r.turn
                ));
            }
        }
        last_turn.insert(r.sbi_id.as_str(), r.turn);
    }
    warnings
}

/// In-memory journal, for tests and scenarios that don't need durability.
pub struct InMemoryJournal {
    records: tokio::sync::Mutex<Vec<JournalRecord>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self {
            records: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn append(&self, record: &JournalRecord) -> Result<()> {
        let mut guard = self.records.lock().await;
        guard.push(record.clone());
        Ok(())
    }

    async fn load(&self) -> Result<JournalLoad> {
        let guard = self.records.lock().await;
        let records = guard.clone();
        let warnings = monotonicity_warnings(&records);
        Ok(JournalLoad { records, warnings })
    }

    async fn find_by_turn(&self, turn: u32) -> Result<Vec<JournalRecord>> {
        let guard = self.records.lock().await;
        Ok(guard.iter().filter(|r| r.turn == turn).cloned().collect())
    }

    async fn find_by_sbi(&self, sbi_id: &TaskId) -> Result<Vec<JournalRecord>> {
        let guard = self.records.lock().await;
        Ok(guard
            .iter()
            .filter(|r| r.sbi_id == *sbi_id)
            .cloned()
            .collect())
    }
}

/// NDJSON file-backed journal at `<root>/var/journal.ndjson`. Appends are
/// serialized by an internal mutex standing in for a per-file fcntl lock —
/// single-process, single-node, as the spec allows.
pub struct FileJournal {
    path: PathBuf,
    write_guard: tokio::sync::Mutex<()>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_raw(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Journal for FileJournal {
    async fn append(&self, record: &JournalRecord) -> Result<()> {
        let record = record.clone();
        let line = serde_json::to_string(&record)?;

        let _guard = self.write_guard.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn load(&self) -> Result<JournalLoad> {
        let contents = self.read_raw().await?;
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warnings.push(format!("journal line {} malformed, skipped: {e}", lineno + 1)),
            }
        }

        warnings.extend(monotonicity_warnings(&records));
        Ok(JournalLoad { records, warnings })
    }

    async fn find_by_turn(&self, turn: u32) -> Result<Vec<JournalRecord>> {
        Ok(self
            .load()
            .await?
            .records
            .into_iter()
            .filter(|r| r.turn == turn)
            .collect())
    }

    async fn find_by_sbi(&self, sbi_id: &TaskId) -> Result<Vec<JournalRecord>> {
        Ok(self
            .load()
            .await?
            .records
            .into_iter()
            .filter(|r| r.sbi_id == *sbi_id)
            .collect())
    }
}
