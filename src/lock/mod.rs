//! Lock manager: run locks (exclusive, process-wide) and state locks
//! (typed READ/WRITE, audit-only typing), both gated by the same
//! acquire-or-reject-with-reap contract.

mod manager;
mod types;

pub use manager::{InMemoryLockManager, LockManager, LockView};
pub use types::{Lease, LockId, LockType, RunLock, StateLock};
