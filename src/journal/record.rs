//! Journal record schema: exactly eight keys, no more, no fewer. (spec.md
//! §3 enumerates eight fields — timestamp, sbiId, turn, step, decision,
//! elapsedMs, error, artifacts — while its own prose calls this "exactly
//! these seven keys"; see DESIGN.md for why `sbiId` is kept as a top-level
//! key despite that count.)

use serde::{Deserialize, Serialize};

use crate::domain::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Plan,
    Implement,
    Test,
    Review,
    Done,
}

/// Journal-vocabulary decision. Note this is *not* the same vocabulary as
/// `ExecutionState::decision` (which also has `SUCCEEDED`/`FAILED`) — per
/// spec.md §9, `SUCCEEDED` in state projects to `OK` in the journal, and a
/// `FAILED` turn is recorded as `decision=PENDING` with a non-empty
/// `error`. The validator rejects a literal `FAILED` journal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Ok,
    NeedsChanges,
    Pending,
}

/// Artifact sum type: a bare path string, or a structured descriptor (e.g.
/// `{"type": "fb_sbi_draft", ...}`). The validator enforces the union;
/// everything downstream treats both forms uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Artifact {
    Path(String),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl Artifact {
    /// The path-like string this artifact carries, if any — a bare path
    /// for `Path`, or the `"path"` field for a structured artifact.
    pub fn path(&self) -> Option<&str> {
        match self {
            Artifact::Path(p) => Some(p),
            Artifact::Object(o) => o.get("path").and_then(|v| v.as_str()),
        }
    }

    /// The `"type"` discriminant for a structured artifact (e.g.
    /// `fb_sbi_draft`, `fb_sbi_registered`).
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Artifact::Path(_) => None,
            Artifact::Object(o) => o.get("type").and_then(|v| v.as_str()),
        }
    }
}

/// One append-only journal row: one step attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JournalRecord {
    pub timestamp: String,
    pub sbi_id: TaskId,
    pub turn: u32,
    pub step: Step,
    pub decision: Decision,
    pub elapsed_ms: u64,
    pub error: String,
    pub artifacts: Vec<Artifact>,
}

impl JournalRecord {
    /// `true` if every string artifact recorded for this record's turn
    /// contains the required `/turn<T>/` marker. Structured artifacts are
    /// exempt (their own `path`, if present, is checked the same way).
    pub fn artifacts_match_turn(&self) -> bool {
        let marker = format!("/turn{}/", self.turn);
        self.artifacts
            .iter()
            .filter_map(Artifact::path)
            .all(|p| p.contains(&marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_exactly_the_eight_schema_keys() {
        let record = JournalRecord {
            timestamp: crate::time::to_rfc3339_nanos(crate::time::now()),
            sbi_id: "s1".into(),
            turn: 1,
            step: Step::Plan,
            decision: Decision::Pending,
            elapsed_ms: 0,
            error: String::new(),
            artifacts: vec![],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 8);
    }

    #[test]
    fn artifact_turn_marker_check() {
        let mut record = JournalRecord {
            timestamp: crate::time::to_rfc3339_nanos(crate::time::now()),
            sbi_id: "s1".into(),
            turn: 2,
            step: Step::Implement,
            decision: Decision::Pending,
            elapsed_ms: 1,
            error: String::new(),
            artifacts: vec![Artifact::Path("specs/sbi/s1/artifacts/turn2/out.txt".into())],
        };
        assert!(record.artifacts_match_turn());
        record
            .artifacts
            .push(Artifact::Path("specs/sbi/s1/artifacts/turn1/stale.txt".into()));
        assert!(!record.artifacts_match_turn());
    }

    #[test]
    fn rejects_extra_keys() {
        let json = serde_json::json!({
            "timestamp": "2024-01-01T00:00:00.000000000Z",
            "sbiId": "s1",
            "turn": 0,
            "step": "plan",
            "decision": "PENDING",
            "elapsedMs": 0,
            "error": "",
            "artifacts": [],
            "extra": "nope"
        });
        let parsed: Result<JournalRecord, _> = serde_json::from_value(json);
        assert!(parsed.is_err());
    }
}
