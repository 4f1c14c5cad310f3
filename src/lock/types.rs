//! Lock record types: `RunLock` (exclusive, process-wide) and `StateLock`
//! (typed READ/WRITE, recorded for audit — the core does not grant
//! reader-parallelism).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Non-empty lock identifier, e.g. `run:<sbiId>`.
pub type LockId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockType {
    Read,
    Write,
}

/// Exclusive, process-wide run lock. At most one live instance per `lock_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLock {
    pub lock_id: LockId,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Typed lease over a shared resource. The type is recorded for audit and
/// policy only — the lock table still allows at most one live holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateLock {
    pub lock_id: LockId,
    pub pid: u32,
    pub lock_type: LockType,
    pub acquired_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Shared lease accessors, implemented identically by `RunLock` and
/// `StateLock`. A trait (rather than one shared struct) keeps the two
/// kinds distinct in the public API the way the spec separates them.
pub trait Lease {
    fn expires_at(&self) -> DateTime<Utc>;
    fn heartbeat_at(&self) -> DateTime<Utc>;
    fn set_expires_at(&mut self, at: DateTime<Utc>);
    fn set_heartbeat_at(&mut self, at: DateTime<Utc>);

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    fn is_heartbeat_stale(&self, threshold: std::time::Duration) -> bool {
        let threshold = ChronoDuration::from_std(threshold).unwrap_or(ChronoDuration::zero());
        Utc::now() - self.heartbeat_at() > threshold
    }

    fn remaining_time(&self) -> std::time::Duration {
        let remaining = self.expires_at() - Utc::now();
        remaining.to_std().unwrap_or(std::time::Duration::ZERO)
    }

    /// Absolute reset: `expires_at = now + d`, never additive on top of
    /// whatever time was left.
    fn extend(&mut self, d: std::time::Duration) {
        let d = ChronoDuration::from_std(d).unwrap_or(ChronoDuration::zero());
        self.set_expires_at(Utc::now() + d);
    }

    fn update_heartbeat(&mut self) {
        self.set_heartbeat_at(Utc::now());
    }
}

macro_rules! impl_lease {
    ($t:ty) => {
        impl Lease for $t {
            fn expires_at(&self) -> DateTime<Utc> {
                self.expires_at
            }
            fn heartbeat_at(&self) -> DateTime<Utc> {
                self.heartbeat_at
            }
            fn set_expires_at(&mut self, at: DateTime<Utc>) {
                self.expires_at = at;
            }
            fn set_heartbeat_at(&mut self, at: DateTime<Utc>) {
                self.heartbeat_at = at;
            }
        }
    };
}

impl_lease!(RunLock);
impl_lease!(StateLock);
