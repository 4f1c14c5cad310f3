//! RFC3339Nano, Z-suffixed UTC timestamp helpers.
//!
//! Every timestamp the spec puts on disk (journal records, `state.json`,
//! `health.json`) is RFC3339 with nanosecond precision and a literal `Z`
//! suffix. `chrono`'s `SecondsFormat::Nanos` with `use_z = true` produces
//! exactly that.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{EngineError, Result};

/// Current UTC instant, truncated to what `to_rfc3339_nanos` will print.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as RFC3339Nano with a `Z` suffix.
pub fn to_rfc3339_nanos(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC3339Nano, `Z`-suffixed timestamp.
///
/// Rejects anything not ending in `Z` even if `chrono` could otherwise
/// parse it (e.g. a `+00:00` offset) — the spec requires the literal
/// suffix, not just UTC.
pub fn parse_rfc3339_nanos(s: &str) -> Result<DateTime<Utc>> {
    if !s.ends_with('Z') {
        return Err(EngineError::InvariantViolation(format!(
            "timestamp {s} is not Z-suffixed RFC3339Nano"
        )));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvariantViolation(format!("bad timestamp {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let ts = now();
        let s = to_rfc3339_nanos(ts);
        assert!(s.ends_with('Z'));
        let parsed = parse_rfc3339_nanos(&s).unwrap();
        assert_eq!(parsed.timestamp_nanos_opt(), ts.timestamp_nanos_opt());
    }

    #[test]
    fn rejects_non_z_suffix() {
        assert!(parse_rfc3339_nanos("2024-01-01T00:00:00.000000000+00:00").is_err());
    }
}
