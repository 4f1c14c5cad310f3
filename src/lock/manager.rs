//! In-memory lock manager.
//!
//! Single `tokio::sync::Mutex<HashMap<..>>` as the compare-and-swap point:
//! every `acquire` holds the mutex for the whole check-then-insert, so two
//! racing callers for the same `lock_id` serialize through it and exactly
//! one observes an empty/expired slot. This is the same shape as
//! `bpmn-lite-core`'s `MemoryStore` (a `tokio::sync::RwLock<Inner>` guarding
//! all mutable state behind one async-trait surface), specialized to a
//! single map since locks need read-modify-write, not independent
//! read/write paths.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::types::{Lease, LockId, LockType, RunLock, StateLock};
use crate::error::{EngineError, Result};

/// Uniform read-only view of a lock, regardless of kind. Used by
/// `find`/`list`, which don't need to distinguish RunLock from StateLock
/// structurally (the `lock_type` field does that).
#[derive(Debug, Clone)]
pub struct LockView {
    pub lock_id: LockId,
    pub pid: u32,
    pub lock_type: Option<LockType>,
    pub acquired_at: chrono::DateTime<Utc>,
    pub heartbeat_at: chrono::DateTime<Utc>,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum Entry {
    Run(RunLock),
    State(StateLock),
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self {
            Entry::Run(l) => l.is_expired(),
            Entry::State(l) => l.is_expired(),
        }
    }

    fn view(&self) -> LockView {
        match self {
            Entry::Run(l) => LockView {
                lock_id: l.lock_id.clone(),
                pid: l.pid,
                lock_type: None,
                acquired_at: l.acquired_at,
                heartbeat_at: l.heartbeat_at,
                expires_at: l.expires_at,
            },
            Entry::State(l) => LockView {
                lock_id: l.lock_id.clone(),
                pid: l.pid,
                lock_type: Some(l.lock_type),
                acquired_at: l.acquired_at,
                heartbeat_at: l.heartbeat_at,
                expires_at: l.expires_at,
            },
        }
    }

    fn update_heartbeat(&mut self) {
        match self {
            Entry::Run(l) => l.update_heartbeat(),
            Entry::State(l) => l.update_heartbeat(),
        }
    }

    fn extend(&mut self, d: Duration) {
        match self {
            Entry::Run(l) => l.extend(d),
            Entry::State(l) => l.extend(d),
        }
    }
}

/// Pluggable lock store surface. The in-memory implementation below is the
/// one used for correctness tests; the persistence interface is async so a
/// file- or SQLite-backed implementation can honor the same atomicity
/// contract.
#[async_trait]
pub trait LockManager: Send + Sync {
    async fn acquire_run(&self, lock_id: &str, ttl: Duration) -> Result<Option<RunLock>>;
    async fn acquire_state(
        &self,
        lock_id: &str,
        lock_type: LockType,
        ttl: Duration,
    ) -> Result<Option<StateLock>>;
    async fn release(&self, lock_id: &str) -> Result<()>;
    async fn find(&self, lock_id: &str) -> Result<LockView>;
    async fn update_heartbeat(&self, lock_id: &str) -> Result<()>;
    async fn extend(&self, lock_id: &str, d: Duration) -> Result<()>;
    /// Reap every expired lock in one pass. Returns the count reaped.
    async fn cleanup_expired(&self) -> Result<usize>;
    async fn list(&self) -> Result<Vec<LockView>>;
}

pub struct InMemoryLockManager {
    pid: u32,
    entries: tokio::sync::Mutex<HashMap<LockId, Entry>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            entries: tokio::sync::Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire_run(&self, lock_id: &str, ttl: Duration) -> Result<Option<RunLock>> {
        let mut guard = self.entries.lock().await;
        if let Some(existing) = guard.get(lock_id) {
            if !existing.is_expired() {
                return Ok(None);
            }
            tracing::warn!(lock_id, "reaping expired run lock on acquire");
        }
        let now = Utc::now();
        let lock = RunLock {
            lock_id: lock_id.to_string(),
            pid: self.pid,
            acquired_at: now,
            heartbeat_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        };
        guard.insert(lock_id.to_string(), Entry::Run(lock.clone()));
        tracing::debug!(lock_id, "run lock acquired");
        Ok(Some(lock))
    }

    async fn acquire_state(
        &self,
        lock_id: &str,
        lock_type: LockType,
        ttl: Duration,
    ) -> Result<Option<StateLock>> {
        let mut guard = self.entries.lock().await;
        if let Some(existing) = guard.get(lock_id) {
            if !existing.is_expired() {
                return Ok(None);
            }
            tracing::warn!(lock_id, "reaping expired state lock on acquire");
        }
        let now = Utc::now();
        let lock = StateLock {
            lock_id: lock_id.to_string(),
            pid: self.pid,
            lock_type,
            acquired_at: now,
            heartbeat_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        };
        guard.insert(lock_id.to_string(), Entry::State(lock.clone()));
        tracing::debug!(lock_id, ?lock_type, "state lock acquired");
        Ok(Some(lock))
    }

    async fn release(&self, lock_id: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        if guard.remove(lock_id).is_none() {
            return Err(EngineError::NotFound(format!("lock {lock_id}")));
        }
        tracing::debug!(lock_id, "lock released");
        Ok(())
    }

    async fn find(&self, lock_id: &str) -> Result<LockView> {
        let guard = self.entries.lock().await;
        guard
            .get(lock_id)
            .map(Entry::view)
            .ok_or_else(|| EngineError::NotFound(format!("lock {lock_id}")))
    }

    async fn update_heartbeat(&self, lock_id: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        let entry = guard
            .get_mut(lock_id)
            .ok_or_else(|| EngineError::NotFound(format!("lock {lock_id}")))?;
        entry.update_heartbeat();
        Ok(())
    }

    async fn extend(&self, lock_id: &str, d: Duration) -> Result<()> {
        let mut guard = self.entries.lock().await;
        let entry = guard
            .get_mut(lock_id)
            .ok_or_else(|| EngineError::NotFound(format!("lock {lock_id}")))?;
        entry.extend(d);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired());
        let reaped = before - guard.len();
        if reaped > 0 {
            tracing::debug!(reaped, "cleaned up expired locks");
        }
        Ok(reaped)
    }

    async fn list(&self) -> Result<Vec<LockView>> {
        let guard = self.entries.lock().await;
        Ok(guard.values().map(Entry::view).collect())
    }
}
