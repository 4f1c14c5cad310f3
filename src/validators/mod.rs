//! File validators: state.json, health.json, journal.ndjson, and the
//! integrated doctor report.

mod doctor;
mod health_validator;
mod journal_validator;
mod result;
mod state_validator;

pub use doctor::{run as run_doctor, DoctorReport};
pub use health_validator::{validate_file as validate_health_file, HEALTH_FILE_NAME};
pub use journal_validator::{validate_file as validate_journal_file, JOURNAL_FILE_NAME};
pub use result::{FileReport, Issue, IssueType, Summary, ValidationResult};
pub use state_validator::{validate_file as validate_state_file, STATE_FILE_NAME};
