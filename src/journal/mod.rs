//! Append-only turn journal: one NDJSON row per step attempt.

mod record;
mod store;

pub use record::{Artifact, Decision, JournalRecord, Step};
pub use store::{FileJournal, InMemoryJournal, Journal, JournalLoad};
